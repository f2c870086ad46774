//! Filter validation errors, each carrying a human-readable path into the
//! document ("must[2].antes[0]").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to parse filter document: {0}")]
    Parse(String),
    #[error("{path}: unknown item type {got:?}")]
    UnknownType { path: String, got: String },
    #[error("{path}: unknown {kind} value {got:?}")]
    UnknownValue {
        path: String,
        kind: &'static str,
        got: String,
    },
    #[error("{path}: unknown edition {got:?}")]
    UnknownEdition { path: String, got: String },
    #[error("{path}: ante {got} is outside 1..=8")]
    AnteOutOfRange { path: String, got: i64 },
    #[error("{path}: slot {got} is outside 0..=5")]
    SlotOutOfRange { path: String, got: i64 },
    #[error("{path}: roll index {got} is negative")]
    RollOutOfRange { path: String, got: i64 },
    #[error("{path}: score is only allowed on should clauses")]
    ScoreOutsidePhase { path: String },
    #[error("{path}: score must be >= 0, got {got}")]
    NegativeScore { path: String, got: i64 },
    #[error("{path}: min must be >= 1, got {got}")]
    BadMin { path: String, got: i64 },
    #[error("{path}: no values left after expansion")]
    EmptyValues { path: String },
    #[error("{path}: {field} must not be empty")]
    EmptyField { path: String, field: &'static str },
    #[error("{path}: compound clause has no nested clauses")]
    EmptyCompound { path: String },
    #[error("{path}: clause must name exactly one category, found {found}")]
    AmbiguousCategory { path: String, found: String },
    #[error("{path}: {field} does not apply to a {kind} clause")]
    FieldNotApplicable {
        path: String,
        field: &'static str,
        kind: &'static str,
    },
    #[error("{path}: erratic clauses cannot be nested inside And/Or")]
    NestedErratic { path: String },
    #[error(transparent)]
    Stream(#[from] cart_rng::StreamError),
}
