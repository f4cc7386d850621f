use std::{fmt::Debug, hash::Hash};

use serde::{Deserialize, Serialize};

/// Trait combining all required bounds for vertex identifiers.
/// Automatically implemented for any type that satisfies all the bounds.
///
/// `Ord` is only used to break score ties deterministically.
pub trait Vertex: Copy + Eq + Hash + Ord + Debug + Send + Sync {}

impl<T> Vertex for T where T: Copy + Eq + Hash + Ord + Debug + Send + Sync {}

/// A directed edge carrying a non-negative path-cost increment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEdge<V> {
    pub from: V,
    pub to: V,
    pub weight: f32,
}

impl<V: Vertex> WeightedEdge<V> {
    pub fn new(from: V, to: V, weight: f32) -> Self {
        WeightedEdge { from, to, weight }
    }

    /// The endpoint reached when walking this edge in `direction`.
    #[inline]
    pub fn head(&self, direction: EdgeDirection) -> V {
        match direction {
            EdgeDirection::Outgoing => self.to,
            EdgeDirection::Incoming => self.from,
        }
    }
}

/// Which adjacency list a shortest-path search walks.
///
/// `Outgoing` computes `d(origin, v)`, `Incoming` computes `d(v, origin)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    Outgoing,
    Incoming,
}

/// Read access to a weighted graph with non-negative edge weights.
///
/// Implementations must reject negative weights at construction time: the
/// frontier expansion relies on Dijkstra's invariant.
pub trait DistanceOracle<V: Vertex> {
    /// Shortest path cost from `from` to `to`, or `None` if `to` is unreachable.
    fn path_cost(&self, from: V, to: V) -> Option<f32>;

    fn edges_from(&self, vertex: V) -> &[WeightedEdge<V>];

    fn edges_to(&self, vertex: V) -> &[WeightedEdge<V>];

    fn node_count(&self) -> usize;

    fn contains_node(&self, vertex: V) -> bool;

    #[inline]
    fn edges(&self, vertex: V, direction: EdgeDirection) -> &[WeightedEdge<V>] {
        match direction {
            EdgeDirection::Outgoing => self.edges_from(vertex),
            EdgeDirection::Incoming => self.edges_to(vertex),
        }
    }
}

/// Content similarity between two vertices, in `[0, 1]` (1 means identical).
pub trait SimilarityOracle<V: Vertex> {
    fn similarity(&self, a: V, b: V) -> f32;
}
