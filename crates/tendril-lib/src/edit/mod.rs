//! Edit planning and application.
//!
//! A user plan maps binding names to replacement values (or closures over
//! a solution's bindings). Planning converts recorded sites into a
//! deduplicated edit list with conflict detection; application walks the
//! root with compare-and-set semantics and precise failure records.

mod apply;
mod plan;

#[cfg(test)]
mod edit_tests;

pub use plan::{
    CasAction, CasFailure, Conflict, ConflictAction, EditOptions, EditPlan, EditReport, PerMode,
    Replacement,
};

pub(crate) use apply::apply_edits;
pub(crate) use plan::{Edit, collect_edits};
