use hashbrown::HashMap;

use crate::{
    graph::{SimilarityOracle, Vertex},
    numerics::VectorLike,
};

/// Similarity collaborator for purely structural workloads: everything is
/// equally dissimilar. Only meaningful with `alpha = beta = 1`, where the
/// similarity term carries no weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSimilarity;

impl<V: Vertex> SimilarityOracle<V> for NoSimilarity {
    fn similarity(&self, a: V, b: V) -> f32 {
        if a == b { 1.0 } else { 0.0 }
    }
}

/// Explicit symmetric similarity table. Missing pairs fall back to `default`.
#[derive(Debug, Clone)]
pub struct SimilarityTable<V: Vertex> {
    pairs: HashMap<(V, V), f32>,
    default: f32,
}

impl<V: Vertex> SimilarityTable<V> {
    pub fn new(default: f32) -> Self {
        SimilarityTable {
            pairs: HashMap::new(),
            default: default.clamp(0.0, 1.0),
        }
    }

    #[inline]
    fn key(a: V, b: V) -> (V, V) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Records the similarity of an unordered pair, clamped to `[0, 1]`.
    pub fn insert(&mut self, a: V, b: V, similarity: f32) {
        self.pairs
            .insert(Self::key(a, b), similarity.clamp(0.0, 1.0));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<V: Vertex> SimilarityOracle<V> for SimilarityTable<V> {
    fn similarity(&self, a: V, b: V) -> f32 {
        if a == b {
            return 1.0;
        }
        self.pairs
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Cosine similarity between per-vertex embedding vectors.
///
/// The query-vector variant is obtained by registering the query vector under
/// the query vertex with [`EmbeddingSimilarity::insert`], or by calling
/// [`EmbeddingSimilarity::similarity_to_vector`] directly.
#[derive(Debug, Clone)]
pub struct EmbeddingSimilarity<V: Vertex> {
    embeddings: HashMap<V, Vec<f32>>,
    dim: usize,
}

impl<V: Vertex> EmbeddingSimilarity<V> {
    pub fn new(dim: usize) -> Self {
        EmbeddingSimilarity {
            embeddings: HashMap::new(),
            dim,
        }
    }

    /// # Panics
    /// Panics if `embedding.len()` differs from the configured dimension.
    pub fn insert(&mut self, vertex: V, embedding: Vec<f32>) {
        assert_eq!(embedding.len(), self.dim, "embedding dimension mismatch");
        self.embeddings.insert(vertex, embedding);
    }

    pub fn similarity_to_vector(&self, query: &[f32], vertex: V) -> f32 {
        self.embeddings
            .get(&vertex)
            .map_or(0.0, |embedding| query.cosine(embedding))
    }
}

impl<V: Vertex> SimilarityOracle<V> for EmbeddingSimilarity<V> {
    fn similarity(&self, a: V, b: V) -> f32 {
        if a == b {
            return 1.0;
        }
        match (self.embeddings.get(&a), self.embeddings.get(&b)) {
            (Some(x), Some(y)) => x.cosine(y),
            _ => 0.0,
        }
    }
}
