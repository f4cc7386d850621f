//! Substitution tracking for swap refinement.
//!
//! Swap refinement derives new candidate sets by replacing one member at a time. This
//! module records, per derived set, which vertices were removed and what replaced them,
//! in FIFO-bounded histories, so that swaps which would undo earlier ones are skipped.

mod fifo_set;
mod substitutions;

pub use fifo_set::*;
pub use substitutions::*;
