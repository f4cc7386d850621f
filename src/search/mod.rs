//! Shortest-path machinery behind diversification.
//!
//! A [`Frontier`] is one incremental Dijkstra search. A [`SourceSearch`] bundles the one or
//! two frontiers of a source under a [`Direction`]. The [`DiversityIterator`] runs a source
//! per set member plus the query and uses the [`Pruner`] to decide when its best complete
//! candidate can be emitted. [`optimal_meeting_point`] reuses the same searches for groups
//! of travellers.

mod bound;
mod diversity_iterator;
mod frontier;
mod meeting_point;
mod scoring;
mod source;

pub use bound::*;
pub use diversity_iterator::*;
pub use frontier::*;
pub use meeting_point::*;
pub use scoring::*;
pub use source::*;
