//! Tendril: a query/rewrite engine for JSON-like data graphs.
//!
//! A pattern written in a compact DSL is compiled to a typed AST; a
//! backtracking matcher searches a value for shapes satisfying it,
//! emitting solutions (variable bindings plus structural sites); an edit
//! planner applies compare-and-set edits back at those sites.
//!
//! # Example
//!
//! ```
//! use tendril_lib::Pattern;
//! use tendril_core::Value;
//!
//! let pattern = Pattern::compile("{ user: { name: $n }, %? }").expect("valid pattern");
//! let data = Value::from_json(r#"{"user": {"name": "ada"}, "extra": 1}"#).unwrap();
//!
//! let solution = pattern.on(&data).solve().unwrap().expect("a match");
//! assert_eq!(solution.get("$n").and_then(|v| v.as_str()), Some("ada"));
//! ```

pub mod diagnostics;
pub mod edit;
pub mod engine;
pub mod parser;
pub mod query;
mod regex_cache;

use text_size::TextRange;

pub use diagnostics::{Diagnostics, DiagnosticsPrinter, Severity};
pub use edit::{
    CasAction, CasFailure, Conflict, ConflictAction, EditOptions, EditPlan, EditReport, PerMode,
};
pub use engine::{Binding, FuelLimits, MatchError, Site};
pub use query::{Anchored, Found, Occurrence, Pattern, PatternBuilder, Solution};
pub use tendril_core::{Map, Path, Step, Value};

/// Errors that abort pattern compilation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// Tokenizer or parser failure, pointing at the farthest position the
    /// parse reached.
    #[error("syntax error: {message}")]
    Syntax { message: String, span: TextRange },
    /// AST-level rule violation (scope resolution, sigil conflict,
    /// misplaced directive).
    #[error("validation error: {message}")]
    Validation {
        message: String,
        diagnostics: Diagnostics,
    },
}

impl CompileError {
    /// The problems as a diagnostics collection, renderable against the
    /// pattern source.
    pub fn diagnostics(&self) -> Diagnostics {
        match self {
            CompileError::Syntax { message, span } => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.error(message.clone(), *span).emit();
                diagnostics
            }
            CompileError::Validation { diagnostics, .. } => diagnostics.clone(),
        }
    }
}

/// Errors that abort an edit operation.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// A group replacement's shape disagrees with the site kind.
    #[error("replacement for `{name}` must be {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// The search backing the edit did not converge.
    #[error(transparent)]
    Match(#[from] MatchError),
}
