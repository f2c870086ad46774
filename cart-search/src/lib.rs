//! cart-search: batched, multithreaded enumeration of the seed lattice.
//!
//! The driver fixes a seed-string prefix per batch, walks the suffixes in
//! eight-lane groups through the compiled filter pipeline, and feeds the
//! durable sink. Progress is checkpointed contiguously so an interrupted
//! search resumes without re-evaluating or skipping any seed.

pub mod cancel;
pub mod driver;
pub mod lattice;

pub use cancel::CancelToken;
pub use driver::{
    CutoffMode, Search, SearchConfig, SearchError, SearchProgress, SearchSummary,
};
pub use lattice::Lattice;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
