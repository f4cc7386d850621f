use crate::{
    graph::Vertex,
    sets::candidates::{Ranked, TotalF32},
};

/// A vertex together with its score under the current candidate set.
///
/// Entries are ordered by score (ascending, lower is better) and then by vertex, so that
/// ties resolve deterministically to the smallest vertex.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub struct CandidateEntry<V> {
    /// Score of the vertex; lower is better.
    pub score: TotalF32,

    /// The scored vertex.
    pub vertex: V,
}

impl<V: Vertex> CandidateEntry<V> {
    pub fn new(vertex: V, score: f32) -> Self {
        CandidateEntry {
            score: score.into(),
            vertex,
        }
    }
}

impl<V: Vertex> Ranked for CandidateEntry<V> {
    type Key = V;

    fn key(&self) -> V {
        self.vertex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_by_score_then_vertex() {
        let a = CandidateEntry::new(7u32, 1.0);
        let b = CandidateEntry::new(3u32, 2.0);
        let c = CandidateEntry::new(2u32, 2.0);
        let mut entries = vec![b, a, c];
        entries.sort();
        assert_eq!(entries, vec![a, c, b]);
    }
}
