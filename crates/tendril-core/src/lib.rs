//! Core data model for Tendril.
//!
//! This crate holds the types every pipeline stage shares: the JSON-like
//! [`Value`] domain being matched and the structural [`Path`]s that point
//! back into it.

pub mod json;
pub mod path;
pub mod value;

#[cfg(test)]
mod path_tests;
#[cfg(test)]
mod value_tests;

pub use path::{Path, Step};
pub use value::{Map, Value};
