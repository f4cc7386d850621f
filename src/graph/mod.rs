//! Graph and similarity collaborators consumed by the diversification engine.
//!
//! The engine only talks to the graph through [`DistanceOracle`] (edges in either
//! direction, point-to-point path cost) and to content similarity through
//! [`SimilarityOracle`]. This module defines both traits along with simple
//! in-memory implementations used by the command-line driver and the tests.

mod oracle;
mod similarity;
mod weighted_graph;

pub use oracle::*;
pub use similarity::*;
pub use weighted_graph::*;
