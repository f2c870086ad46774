//! cart-rng: keyed deterministic number streams and eight-lane vector primitives.
//!
//! A stream is identified by a short ASCII key (domain tag + ante digit) plus
//! the seed string; equal keys over equal seeds always produce identical
//! sequences of doubles in [0, 1). The eight-lane types advance eight
//! independent seeds in lockstep and are bit-identical to eight scalar
//! evaluations.

pub mod lanes;
pub mod mix;
pub mod plan;
pub mod stream;


pub use lanes::{F64x8, Mask8, U64x8, LANES};
pub use mix::{fold_key, mix64, unit_f64};
pub use plan::{StreamBank, StreamId, StreamPlan};
pub use stream::{Stream, StreamError, StreamVec, MAX_KEY_LEN};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
