//! Specialized data structures for diversification search.
//!
//! # Submodules
//!
//! - [`candidates`]: Ordered scores, scored vertices and bounded best-k collections
//! - [`lineage`]: FIFO-bounded substitution histories used to break swap cycles

pub mod candidates;
pub mod lineage;
