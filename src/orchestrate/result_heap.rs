use serde::Serialize;

use crate::{
    graph::Vertex,
    sets::candidates::{Ranked, SmallestK, TotalF32},
};

/// A fully grown candidate set with its score (lower is better).
///
/// Members keep their insertion order, which the set score depends on; two sets with the
/// same members in a different order are the same result for the heap.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScoredSet<V> {
    pub score: TotalF32,
    pub members: Vec<V>,
}

impl<V: Vertex> ScoredSet<V> {
    pub fn new(members: Vec<V>, score: f32) -> Self {
        ScoredSet {
            score: score.into(),
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<V: Vertex> Ranked for ScoredSet<V> {
    type Key = Vec<V>;

    fn key(&self) -> Vec<V> {
        let mut key = self.members.clone();
        key.sort_unstable();
        key
    }
}

/// Best `k` result sets seen so far.
pub type ResultHeap<V> = SmallestK<ScoredSet<V>>;
