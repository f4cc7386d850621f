use std::{cmp::Reverse, collections::BinaryHeap};

use hashbrown::HashMap;

use crate::{
    graph::{DistanceOracle, EdgeDirection, Vertex},
    sets::candidates::TotalF32,
};

/// A pending relaxation: `to` can be reached with total cost `weight` through `from`.
///
/// Ordered by weight first so that the frontier's heap yields the cheapest relaxation,
/// then by endpoints for determinism.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Relaxation<V> {
    pub weight: TotalF32,
    pub to: V,
    pub from: V,
}

/// A vertex whose shortest distance from the frontier's origin has just been finalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settled<V> {
    pub vertex: V,
    pub distance: f32,
}

/// Incremental single-source Dijkstra search.
///
/// The frontier is advanced one settled vertex at a time, so that several frontiers can be
/// interleaved by the caller in global cost order.
///
/// # Invariants
/// - `settled[v]` is final: edge weights are non-negative, so once popped a vertex is never
///   improved.
/// - Every pending relaxation has a weight `>=` the largest settled distance.
/// - The origin is settled at distance 0 on construction.
#[derive(Clone, Debug)]
pub struct Frontier<V: Vertex> {
    direction: EdgeDirection,
    queue: BinaryHeap<Reverse<Relaxation<V>>>,
    settled: HashMap<V, f32>,
}

impl<V: Vertex> Frontier<V> {
    /// Settles `origin` and schedules its edges in `direction`.
    pub fn new<G: DistanceOracle<V>>(graph: &G, origin: V, direction: EdgeDirection) -> Self {
        let mut frontier = Frontier {
            direction,
            queue: BinaryHeap::new(),
            settled: HashMap::new(),
        };
        frontier.settled.insert(origin, 0.0);
        frontier.relax_from(graph, origin, 0.0);
        frontier
    }

    fn relax_from<G: DistanceOracle<V>>(&mut self, graph: &G, vertex: V, distance: f32) {
        for edge in graph.edges(vertex, self.direction) {
            let head = edge.head(self.direction);
            if !self.settled.contains_key(&head) {
                self.queue.push(Reverse(Relaxation {
                    weight: (distance + edge.weight).into(),
                    to: head,
                    from: vertex,
                }));
            }
        }
    }

    /// Pops relaxations until a new vertex is settled.
    ///
    /// # Returns
    /// The newly settled vertex, or `None` once every reachable vertex is settled.
    pub fn advance<G: DistanceOracle<V>>(&mut self, graph: &G) -> Option<Settled<V>> {
        while let Some(Reverse(relaxation)) = self.queue.pop() {
            if self.settled.contains_key(&relaxation.to) {
                continue;
            }
            let distance = relaxation.weight.get();
            self.settled.insert(relaxation.to, distance);
            self.relax_from(graph, relaxation.to, distance);
            return Some(Settled {
                vertex: relaxation.to,
                distance,
            });
        }
        None
    }

    /// Weight of the cheapest pending relaxation, `None` when the frontier is exhausted.
    ///
    /// Stale relaxations towards already settled vertices are not skipped, so this can
    /// under-estimate the next settled distance; it never over-estimates it.
    #[inline]
    pub fn min_pending(&self) -> Option<f32> {
        self.queue.peek().map(|Reverse(r)| r.weight.get())
    }

    /// Lower bound on the distance of any vertex not yet settled (`INFINITY` once exhausted).
    #[inline]
    pub fn unsettled_lower_bound(&self) -> f32 {
        self.min_pending().unwrap_or(f32::INFINITY)
    }

    #[inline]
    pub fn distance(&self, vertex: V) -> Option<f32> {
        self.settled.get(&vertex).copied()
    }

    /// Lower bound on the distance to `vertex`: exact if settled, the frontier minimum otherwise.
    #[inline]
    pub fn distance_lower_bound(&self, vertex: V) -> f32 {
        self.distance(vertex)
            .unwrap_or_else(|| self.unsettled_lower_bound())
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of entries held by the frontier, for memory accounting.
    pub fn live_entries(&self) -> usize {
        self.settled.len() + self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WeightedGraph;

    // 0 -> 1 (1), 0 -> 2 (4), 1 -> 2 (1), 2 -> 3 (1), 4 -> 0 (2)
    fn graph() -> WeightedGraph<u32> {
        WeightedGraph::from_edges([(0, 1, 1.0), (0, 2, 4.0), (1, 2, 1.0), (2, 3, 1.0), (4, 0, 2.0)])
            .unwrap()
    }

    #[test]
    fn settles_in_distance_order() {
        let graph = graph();
        let mut frontier = Frontier::new(&graph, 0, EdgeDirection::Outgoing);
        let mut order = vec![];
        while let Some(settled) = frontier.advance(&graph) {
            order.push((settled.vertex, settled.distance));
        }
        assert_eq!(order, vec![(1, 1.0), (2, 2.0), (3, 3.0)]);
        assert!(frontier.is_exhausted());
        assert_eq!(frontier.distance(0), Some(0.0));
        assert_eq!(frontier.distance(4), None);
    }

    #[test]
    fn incoming_direction_computes_distances_to_origin() {
        let graph = graph();
        let mut frontier = Frontier::new(&graph, 2, EdgeDirection::Incoming);
        while frontier.advance(&graph).is_some() {}
        assert_eq!(frontier.distance(1), Some(1.0));
        assert_eq!(frontier.distance(0), Some(2.0));
        assert_eq!(frontier.distance(4), Some(4.0));
        assert_eq!(frontier.distance(3), None);
    }

    #[test]
    fn pending_minimum_never_exceeds_next_settled_distance() {
        let graph = graph();
        let mut frontier = Frontier::new(&graph, 0, EdgeDirection::Outgoing);
        loop {
            let bound = frontier.unsettled_lower_bound();
            match frontier.advance(&graph) {
                Some(settled) => assert!(bound <= settled.distance),
                None => break,
            }
        }
        assert_eq!(frontier.unsettled_lower_bound(), f32::INFINITY);
    }

    #[test]
    fn distance_lower_bound_uses_frontier_minimum() {
        let graph = graph();
        let mut frontier = Frontier::new(&graph, 0, EdgeDirection::Outgoing);
        frontier.advance(&graph);
        // 1 settled at 1.0; cheapest pending relaxation is 0 -> 1 -> 2 at 2.0
        assert_eq!(frontier.distance_lower_bound(1), 1.0);
        assert_eq!(frontier.distance_lower_bound(3), 2.0);
    }
}
