pub mod error;
pub mod fs;
pub mod graph;
pub mod numerics;
pub mod orchestrate;
pub mod search;
pub mod sets;
pub mod statistics;

pub use error::{DivError, Result};
