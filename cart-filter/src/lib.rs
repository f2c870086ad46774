//! cart-filter: the filter document and its compiled pipeline.
//!
//! A filter document is loaded (JSON or YAML), normalized into canonical
//! form, and compiled into an ordered list of vectorized clause evaluators
//! that share stream work across clauses. Validation happens entirely at
//! load/compile time; the evaluation path has no error cases.

pub mod compile;
pub mod doc;
pub mod error;
pub mod eval;
pub mod normalize;

#[cfg(test)]
mod normalize_tests;
#[cfg(test)]
mod eval_tests;

pub use compile::{compile, CompiledFilter, LaneOutcome, NO_CUTOFF};
pub use doc::{Clause, ClauseKind, Defaults, DocFormat, FilterDoc};
pub use error::FilterError;
pub use normalize::normalize;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
