//! Text loaders for graphs, similarities and query batches.
//!
//! Every format is line based: blank lines and lines starting with `#` are ignored, fields
//! are separated by whitespace. Errors carry the 1-based line number.

mod edge_list_load;
mod query_load;
mod records;
mod similarity_load;

pub use edge_list_load::*;
pub use query_load::*;
pub use similarity_load::*;
