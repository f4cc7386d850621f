use hashbrown::HashMap;

use crate::{
    error::{DivError, Result},
    graph::{DistanceOracle, EdgeDirection, Vertex, WeightedEdge},
    search::Frontier,
};

/// In-memory directed graph with non-negative edge weights.
///
/// # Invariants
/// - Every vertex has an entry in both `outgoing` and `incoming`, possibly empty.
/// - Every stored weight is finite and `>= 0`.
/// - `outgoing[u]` contains `e` iff `incoming[e.to]` contains `e`.
#[derive(Debug, Clone)]
pub struct WeightedGraph<V: Vertex> {
    outgoing: HashMap<V, Vec<WeightedEdge<V>>>,
    incoming: HashMap<V, Vec<WeightedEdge<V>>>,
    edge_count: usize,
}

impl<V: Vertex> WeightedGraph<V> {
    pub fn new() -> Self {
        WeightedGraph {
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Builds a directed graph from `(from, to, weight)` triples.
    pub fn from_edges(edges: impl IntoIterator<Item = (V, V, f32)>) -> Result<Self> {
        let mut graph = Self::new();
        for (from, to, weight) in edges {
            graph.add_edge(from, to, weight)?;
        }
        Ok(graph)
    }

    /// Builds a graph where each triple is inserted in both directions.
    pub fn from_undirected_edges(edges: impl IntoIterator<Item = (V, V, f32)>) -> Result<Self> {
        let mut graph = Self::new();
        for (from, to, weight) in edges {
            graph.add_undirected_edge(from, to, weight)?;
        }
        Ok(graph)
    }

    pub fn add_vertex(&mut self, vertex: V) {
        self.outgoing.entry(vertex).or_default();
        self.incoming.entry(vertex).or_default();
    }

    /// Adds the directed edge `from -> to`.
    ///
    /// # Errors
    /// Returns [`DivError::NegativeWeight`] for negative, NaN or infinite weights.
    pub fn add_edge(&mut self, from: V, to: V, weight: f32) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(DivError::NegativeWeight {
                from: format!("{from:?}"),
                to: format!("{to:?}"),
                weight,
            });
        }
        self.add_vertex(from);
        self.add_vertex(to);

        let edge = WeightedEdge::new(from, to, weight);
        if let Some(list) = self.outgoing.get_mut(&from) {
            list.push(edge);
        }
        if let Some(list) = self.incoming.get_mut(&to) {
            list.push(edge);
        }
        self.edge_count += 1;
        Ok(())
    }

    pub fn add_undirected_edge(&mut self, a: V, b: V, weight: f32) -> Result<()> {
        self.add_edge(a, b, weight)?;
        self.add_edge(b, a, weight)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn vertices(&self) -> impl Iterator<Item = V> + '_ {
        self.outgoing.keys().copied()
    }
}

impl<V: Vertex> Default for WeightedGraph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vertex> DistanceOracle<V> for WeightedGraph<V> {
    fn path_cost(&self, from: V, to: V) -> Option<f32> {
        if !self.contains_node(from) || !self.contains_node(to) {
            return None;
        }
        let mut frontier = Frontier::new(self, from, EdgeDirection::Outgoing);
        while frontier.distance(to).is_none() {
            frontier.advance(self)?;
        }
        frontier.distance(to)
    }

    fn edges_from(&self, vertex: V) -> &[WeightedEdge<V>] {
        self.outgoing.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    fn edges_to(&self, vertex: V) -> &[WeightedEdge<V>] {
        self.incoming.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    fn contains_node(&self, vertex: V) -> bool {
        self.outgoing.contains_key(&vertex)
    }
}
