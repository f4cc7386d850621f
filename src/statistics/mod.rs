//! Performance statistics tracking for diversification searches.
//!
//! This module provides structures for collecting and aggregating metrics about
//! search work, including iterator calls, vertices settled, candidates emitted,
//! timeouts and a running estimate of live map entries.

mod stats;
pub use stats::*;
