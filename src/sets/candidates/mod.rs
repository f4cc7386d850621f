//! Candidate ranking structures for the diversification engine.
//!
//! This module provides a totally ordered float wrapper used for scores and path costs,
//! scored vertex entries, and a bounded k-smallest collection with deduplication that
//! backs both the pruner's top-C prefix and the orchestrators' result heap.

mod candidate_entry;
mod ordered_float;
mod smallest_k;

pub use candidate_entry::*;
pub use ordered_float::*;
pub use smallest_k::*;
