//! Numerical helpers for embedding vectors.
//!
//! This module provides the small amount of linear algebra needed by the
//! content-similarity collaborators (dot products, norms and cosine similarity).

mod f32slice;

pub use f32slice::VectorLike;
