use std::{cmp::Reverse, collections::BinaryHeap};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::{
    graph::{SimilarityOracle, Vertex},
    search::{ScoreParams, SourceSearch},
    sets::candidates::CandidateEntry,
};

/// Default size of the partial-candidate prefix examined by [`PruningMode::Bounded`].
pub const DEFAULT_BOUND_PREFIX: usize = 5;

/// How hard the iterator works before it emits a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruningMode {
    /// Emit only once no incomplete vertex can possibly score better. Candidates come out
    /// in exact `(score, vertex)` order.
    Exhaustive,
    /// Compare against the `prefix` most promising partial candidates only, and treat
    /// vertices the query has not reached as if they sat on its frontier. Faster, but may
    /// emit out of order.
    Bounded { prefix: usize },
}

impl PruningMode {
    /// Whether the best complete candidate with score `best` may be emitted against `threshold`.
    ///
    /// Exhaustive mode requires a strict win so that equal-score vertices still resolve by
    /// vertex order.
    #[inline]
    pub fn admits(self, best: f32, threshold: f32) -> bool {
        match self {
            PruningMode::Exhaustive => best < threshold,
            PruningMode::Bounded { .. } => best <= threshold,
        }
    }
}

impl Default for PruningMode {
    fn default() -> Self {
        PruningMode::Bounded {
            prefix: DEFAULT_BOUND_PREFIX,
        }
    }
}

/// Vertices the query has settled but some member has not, keyed by a lower bound on their
/// score.
///
/// Keys go stale as the member searches advance. A stale key can only be too low, since a
/// bound never decreases while the set is fixed, so entries are re-keyed when they reach
/// the front instead of on every settled vertex.
#[derive(Debug, Clone)]
pub struct PartialCandidates<V: Vertex> {
    queue: BinaryHeap<Reverse<CandidateEntry<V>>>,
    queued: HashSet<V>,
}

impl<V: Vertex> PartialCandidates<V> {
    pub fn new() -> Self {
        PartialCandidates {
            queue: BinaryHeap::new(),
            queued: HashSet::new(),
        }
    }

    /// Queues `vertex` with key `bound` unless it is queued already.
    pub fn insert(&mut self, vertex: V, bound: f32) -> bool {
        if !self.queued.insert(vertex) {
            return false;
        }
        self.queue.push(Reverse(CandidateEntry::new(vertex, bound)));
        true
    }

    fn peek(&self) -> Option<CandidateEntry<V>> {
        self.queue.peek().map(|&Reverse(entry)| entry)
    }

    fn pop(&mut self) -> Option<CandidateEntry<V>> {
        let Reverse(entry) = self.queue.pop()?;
        self.queued.remove(&entry.vertex);
        Some(entry)
    }

    pub fn contains(&self, vertex: V) -> bool {
        self.queued.contains(&vertex)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<V: Vertex> Default for PartialCandidates<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-bounds the score of every vertex that is not complete yet.
///
/// Borrowed view over the searches of an iterator; built on demand each time a threshold
/// is needed.
pub struct Pruner<'s, V: Vertex, S> {
    pub params: &'s ScoreParams,
    pub similarity: &'s S,
    pub query: &'s SourceSearch<V>,
    pub members: &'s [SourceSearch<V>],
}

impl<V: Vertex, S: SimilarityOracle<V>> Pruner<'_, V, S> {
    /// Threshold below which the best complete candidate is provably (exhaustive) or
    /// heuristically (bounded) the next one to emit.
    ///
    /// Complete and dead vertices met at the front of `partial` are dropped from it.
    pub fn threshold(&self, mode: PruningMode, partial: &mut PartialCandidates<V>) -> f32 {
        let unreached = self.unreached_bound(mode);
        if unreached == f32::NEG_INFINITY {
            return unreached;
        }
        let known = match mode {
            PruningMode::Exhaustive => self.smallest_bound(partial),
            PruningMode::Bounded { prefix } => self.prefix_bound(prefix, partial),
        };
        unreached.min(known)
    }

    /// Whether some active source can never reach `vertex`.
    pub fn is_dead(&self, vertex: V) -> bool {
        self.query.never_reaches(vertex) || self.members.iter().any(|m| m.never_reaches(vertex))
    }

    /// Whether `vertex` no longer belongs among the partial candidates.
    fn is_settled_or_dead(&self, vertex: V) -> bool {
        (self.query.distance(vertex).is_some() && self.members.iter().all(|m| m.distance(vertex).is_some()))
            || self.is_dead(vertex)
    }

    /// Exact minimum of the current bounds: the front entry is re-keyed until its key is
    /// up to date, which makes it the smallest bound of all.
    fn smallest_bound(&self, partial: &mut PartialCandidates<V>) -> f32 {
        while let Some(front) = partial.peek() {
            if self.is_settled_or_dead(front.vertex) {
                partial.pop();
                continue;
            }
            let bound = self.vertex_lower_bound(front.vertex);
            if bound <= front.score.get() {
                return front.score.get();
            }
            partial.pop();
            partial.insert(front.vertex, bound);
        }
        f32::INFINITY
    }

    /// Smallest refreshed bound among the first `prefix` entries.
    fn prefix_bound(&self, prefix: usize, partial: &mut PartialCandidates<V>) -> f32 {
        let mut shortlist = Vec::with_capacity(prefix);
        while shortlist.len() < prefix.max(1) {
            let Some(front) = partial.pop() else {
                break;
            };
            if !self.is_settled_or_dead(front.vertex) {
                shortlist.push((front.vertex, self.vertex_lower_bound(front.vertex)));
            }
        }
        let threshold = shortlist
            .iter()
            .map(|&(_, bound)| bound)
            .fold(f32::INFINITY, f32::min);
        for (vertex, bound) in shortlist {
            partial.insert(vertex, bound);
        }
        threshold
    }

    /// Lower bound over every vertex whose query distance is still unknown.
    ///
    /// With `x = d(q,v)` and the triangle inequality on every member distance,
    /// `score(v) >= c·x - (1-λ)·(β·agg_s d(s,q) + (1-β))` with `c = λα - (1-λ)β`.
    /// When `c >= 0` the bound is smallest at the query frontier minimum. When `c < 0`
    /// exhaustive mode can say nothing until the query frontier is exhausted, while
    /// bounded mode still evaluates it at the frontier minimum.
    pub fn unreached_bound(&self, mode: PruningMode) -> f32 {
        let nearest = self.query.unsettled_lower_bound();
        if nearest == f32::INFINITY {
            return f32::INFINITY;
        }
        let params = self.params;
        if self.members.is_empty() {
            return params.combine(params.relevance(nearest, 1.0), 0.0);
        }

        let slope = params.distance_slope();
        if slope < 0.0 && mode == PruningMode::Exhaustive {
            return f32::NEG_INFINITY;
        }
        let mut to_query = Vec::with_capacity(self.members.len());
        for member in self.members {
            match member.distance(self.query.source()) {
                Some(distance) => to_query.push(distance),
                None => return f32::NEG_INFINITY,
            }
        }
        let diversity_offset = params.dissimilarity(params.aggregate(to_query), 0.0);
        let relevance_part = if slope == 0.0 { 0.0 } else { slope * nearest };
        relevance_part - (1.0 - params.lambda) * diversity_offset
    }

    /// Lower bound for a vertex with known query distance: exact relevance, member distances
    /// replaced by their upper bounds (the diversity term is subtracted).
    ///
    /// Never decreases while the set is fixed: upper bounds only tighten as members settle
    /// the query and the vertex.
    pub fn vertex_lower_bound(&self, vertex: V) -> f32 {
        let Some(query_distance) = self.query.distance(vertex) else {
            return self.unreached_bound(PruningMode::Exhaustive);
        };
        let params = self.params;
        let relevance = params.relevance(
            query_distance,
            self.similarity.similarity(self.query.source(), vertex),
        );
        let diversity = params.aggregate(self.members.iter().map(|member| {
            params.dissimilarity(
                member.distance_upper_bound(vertex, self.query),
                self.similarity.similarity(member.source(), vertex),
            )
        }));
        params.combine(relevance, diversity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{DistanceOracle, NoSimilarity, WeightedGraph},
        search::{Aggregation, Direction, Leg},
    };

    fn exhaust(search: &mut SourceSearch<u32>, graph: &WeightedGraph<u32>) {
        while let Some((leg, _)) = search.cheapest_leg() {
            search.frontier_mut(leg).unwrap().advance(graph);
        }
    }

    fn step(search: &mut SourceSearch<u32>, graph: &WeightedGraph<u32>) {
        if let Some((leg, _)) = search.cheapest_leg() {
            search.frontier_mut(leg).unwrap().advance(graph);
        }
    }

    // undirected path 0 - 1 - 2 - 3 - 4 with unit weights
    fn path() -> WeightedGraph<u32> {
        WeightedGraph::from_undirected_edges([(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)])
            .unwrap()
    }

    fn true_score(graph: &WeightedGraph<u32>, params: &ScoreParams, query: u32, members: &[u32], v: u32) -> f32 {
        params.vertex_score(
            graph.path_cost(query, v).unwrap(),
            0.0,
            members.iter().map(|&m| (graph.path_cost(m, v).unwrap(), 0.0)),
        )
    }

    #[test]
    fn empty_set_bound_is_the_query_frontier() {
        let graph = path();
        let params = ScoreParams::default();
        let mut query = SourceSearch::new(&graph, 0, Direction::Ordered);
        step(&mut query, &graph);
        step(&mut query, &graph);
        let pruner = Pruner {
            params: &params,
            similarity: &NoSimilarity,
            query: &query,
            members: &[],
        };
        // vertices 1, 2 settled; next pending costs 3.0
        assert_eq!(pruner.unreached_bound(PruningMode::Exhaustive), 0.5 * 3.0);
    }

    #[test]
    fn negative_slope_gives_no_bound_until_exhausted() {
        let graph = path();
        let params = ScoreParams::new(0.2, 1.0, 1.0, Aggregation::Sum, Direction::Ordered);
        let mut query = SourceSearch::new(&graph, 0, Direction::Ordered);
        let mut member = SourceSearch::new(&graph, 1, Direction::Ordered);
        exhaust(&mut member, &graph);
        let members = [member];
        {
            let pruner = Pruner {
                params: &params,
                similarity: &NoSimilarity,
                query: &query,
                members: &members,
            };
            assert_eq!(pruner.unreached_bound(PruningMode::Exhaustive), f32::NEG_INFINITY);
        }
        exhaust(&mut query, &graph);
        let pruner = Pruner {
            params: &params,
            similarity: &NoSimilarity,
            query: &query,
            members: &members,
        };
        assert_eq!(pruner.unreached_bound(PruningMode::Exhaustive), f32::INFINITY);
    }

    #[test]
    fn exhaustive_bounds_never_overestimate() {
        let graph = path();
        let params = ScoreParams::new(0.7, 1.0, 1.0, Aggregation::Sum, Direction::Ordered);
        let mut query = SourceSearch::new(&graph, 0, Direction::Ordered);
        let mut member = SourceSearch::new(&graph, 2, Direction::Ordered);
        for _ in 0..3 {
            step(&mut query, &graph);
            step(&mut member, &graph);
            let members = [member.clone()];
            let pruner = Pruner {
                params: &params,
                similarity: &NoSimilarity,
                query: &query,
                members: &members,
            };
            for v in [1u32, 3, 4] {
                let truth = true_score(&graph, &params, 0, &[2], v);
                assert!(pruner.vertex_lower_bound(v) <= truth + 1e-5, "vertex {v}");
                if query.distance(v).is_none() {
                    assert!(pruner.unreached_bound(PruningMode::Exhaustive) <= truth + 1e-5, "vertex {v}");
                }
            }
        }
    }

    #[test]
    fn symmetric_upper_bounds_stay_valid() {
        let graph = WeightedGraph::from_edges([(0u32, 1, 1.0), (1, 2, 2.0), (2, 0, 1.0), (1, 0, 4.0)]).unwrap();
        let params = ScoreParams::new(0.6, 1.0, 1.0, Aggregation::Max, Direction::Symmetric);
        let mut query = SourceSearch::new(&graph, 0, Direction::Symmetric);
        let mut member = SourceSearch::new(&graph, 1, Direction::Symmetric);
        exhaust(&mut query, &graph);
        exhaust(&mut member, &graph);
        let members = [member];
        let pruner = Pruner {
            params: &params,
            similarity: &NoSimilarity,
            query: &query,
            members: &members,
        };
        let exact = Direction::Symmetric.path_cost(&graph, 1, 2).unwrap();
        assert_eq!(members[0].distance_upper_bound(2, &query), exact);
        assert!(members[0].frontier(Leg::Backward).is_some());
        assert!(pruner.vertex_lower_bound(2).is_finite());
    }

    #[test]
    fn bounded_threshold_uses_the_prefix() {
        let graph = path();
        let params = ScoreParams::default();
        let mut query = SourceSearch::new(&graph, 0, Direction::Ordered);
        step(&mut query, &graph);
        let pruner = Pruner {
            params: &params,
            similarity: &NoSimilarity,
            query: &query,
            members: &[],
        };
        let mut partial = PartialCandidates::new();
        // vertex 1 is complete for an empty set and leaves the queue
        partial.insert(1u32, 0.5);
        let threshold = pruner.threshold(PruningMode::Bounded { prefix: 1 }, &mut partial);
        // unreached vertices start at 2.0
        assert_eq!(threshold, 0.5 * 2.0);
        assert!(partial.is_empty());
        assert!(PruningMode::default().admits(1.0, threshold));
        assert!(!PruningMode::Exhaustive.admits(1.0, threshold));
    }

    #[test]
    fn member_terms_use_upper_bounds() {
        // triangle 0-1-2 with pendants 3 (on 1), 4 (on 2) and 5 (on 0)
        let graph = WeightedGraph::from_undirected_edges([
            (0u32, 1, 1.0),
            (1, 2, 1.0),
            (0, 2, 2.0),
            (1, 3, 2.0),
            (2, 4, 1.0),
            (0, 5, 3.0),
        ])
        .unwrap();
        let params = ScoreParams::default();
        let mut query = SourceSearch::new(&graph, 0, Direction::Ordered);
        exhaust(&mut query, &graph);
        let mut member = SourceSearch::new(&graph, 1, Direction::Ordered);
        // settles 0 and 2 at distance 1
        step(&mut member, &graph);
        step(&mut member, &graph);
        let members = [member];
        let pruner = Pruner {
            params: &params,
            similarity: &NoSimilarity,
            query: &query,
            members: &members,
        };
        // d(1,5) <= d(1,0) + d(0,5) = 4, so 5 may still score 0.5·3 - 0.5·4
        assert_eq!(pruner.vertex_lower_bound(5), -0.5);
        assert_eq!(true_score(&graph, &params, 0, &[1], 5), -0.5);
        for mode in [PruningMode::Exhaustive, PruningMode::default()] {
            let mut partial = PartialCandidates::new();
            for v in [3u32, 4, 5] {
                partial.insert(v, pruner.vertex_lower_bound(v));
            }
            let threshold = pruner.threshold(mode, &mut partial);
            assert_eq!(threshold, -0.5, "{mode:?}");
            // vertex 2 is complete at 0.5 and must wait for 5
            assert!(!mode.admits(0.5, threshold), "{mode:?}");
        }
    }

    #[test]
    fn stale_keys_are_refreshed_at_the_front() {
        let graph = path();
        let params = ScoreParams::new(0.7, 1.0, 1.0, Aggregation::Sum, Direction::Ordered);
        let mut query = SourceSearch::new(&graph, 0, Direction::Ordered);
        exhaust(&mut query, &graph);
        let mut member = SourceSearch::new(&graph, 2, Direction::Ordered);
        let mut partial = PartialCandidates::new();
        for v in [1u32, 3, 4] {
            partial.insert(v, f32::NEG_INFINITY);
        }
        loop {
            let members = [member.clone()];
            let pruner = Pruner {
                params: &params,
                similarity: &NoSimilarity,
                query: &query,
                members: &members,
            };
            let expected = [1u32, 3, 4]
                .into_iter()
                .filter(|&v| members[0].distance(v).is_none())
                .map(|v| pruner.vertex_lower_bound(v))
                .fold(f32::INFINITY, f32::min);
            assert_eq!(pruner.threshold(PruningMode::Exhaustive, &mut partial), expected);
            if member.is_exhausted() {
                break;
            }
            step(&mut member, &graph);
        }
        assert!(partial.is_empty());
    }
}
