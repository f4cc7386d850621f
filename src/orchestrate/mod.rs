//! Entry points that turn diversity iterators into ranked result sets.
//!
//! [`diversify`] seeds singleton sets from the query's nearest neighbours and grows them
//! greedily; [`refine`] improves a population of sets by local swaps. Both keep their
//! best results in a [`ResultHeap`].

mod config;
mod greedy;
mod result_heap;
mod swap;

pub use config::*;
pub use greedy::*;
pub use result_heap::*;
pub use swap::*;
