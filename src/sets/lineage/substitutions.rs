use hashbrown::HashMap;

use crate::{graph::Vertex, sets::lineage::FifoSet};

/// How many substitutes are remembered per removed vertex.
pub const LINEAGE_DEPTH: usize = 8;

/// Substitution history of a candidate set derived through swap refinement.
///
/// Maps every vertex removed along the derivation chain to the vertices that took its
/// place, so that a swap which undoes or repeats an earlier one can be refused. This is a
/// heuristic: it catches direct back-and-forth swaps and repeats of a recorded swap, not
/// every possible cycle.
#[derive(Debug, Clone)]
pub struct Lineage<V: Vertex> {
    history: HashMap<V, FifoSet<V, LINEAGE_DEPTH>>,
}

impl<V: Vertex> Lineage<V> {
    pub fn new() -> Self {
        Lineage {
            history: HashMap::new(),
        }
    }

    /// Removed vertices that `vertex` currently stands in for.
    fn origins_of(&self, vertex: V) -> Vec<V> {
        self.history
            .iter()
            .filter(|(_, substitutes)| substitutes.newest() == Some(vertex))
            .map(|(&origin, _)| origin)
            .collect()
    }

    /// Whether replacing `removed` by `substitute` revisits a recorded substitution.
    pub fn repeats(&self, removed: V, substitute: V) -> bool {
        let undoes = self
            .history
            .get(&substitute)
            .is_some_and(|subs| subs.contains(removed));
        let replays = self
            .history
            .get(&removed)
            .is_some_and(|subs| subs.contains(substitute));
        undoes || replays
    }

    /// Returns the lineage extended with `removed -> substitute`, leaving `self` untouched.
    pub fn record(&self, removed: V, substitute: V) -> Self {
        let mut next = self.clone();
        for origin in self.origins_of(removed) {
            next.history.entry(origin).or_default().insert(substitute);
        }
        next.history.entry(removed).or_default().insert(substitute);
        next
    }

    /// Number of distinct vertices removed along the chain.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl<V: Vertex> Default for Lineage<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_lineage_allows_everything() {
        let lineage = Lineage::<u32>::new();
        assert!(!lineage.repeats(1, 2));
        assert!(lineage.is_empty());
    }

    #[test]
    fn direct_undo_is_refused() {
        let lineage = Lineage::<u32>::new().record(1, 2);
        assert!(lineage.repeats(2, 1));
        assert!(!lineage.repeats(2, 3));
    }

    #[test]
    fn replay_is_refused() {
        let lineage = Lineage::<u32>::new().record(1, 2);
        assert!(lineage.repeats(1, 2));
    }

    #[test]
    fn chain_back_to_origin_is_refused() {
        // 1 was replaced by 2, then 2 by 3: bringing 1 back in place of 3 closes the loop.
        let lineage = Lineage::<u32>::new().record(1, 2).record(2, 3);
        assert!(lineage.repeats(3, 1));
        assert!(!lineage.repeats(3, 4));
        assert_eq!(lineage.len(), 2);
    }

    #[test]
    fn record_does_not_mutate_parent() {
        let parent = Lineage::<u32>::new().record(1, 2);
        let _child = parent.record(2, 3);
        assert_eq!(parent.len(), 1);
    }
}
