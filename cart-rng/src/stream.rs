//! Keyed streams of doubles in [0, 1).
//!
//! Draw `i` of a stream is a pure function of (folded key state, i), so
//! sequential `next()` and random-access `draw_at(i)` agree by construction.
//! That property is load-bearing: slot- and index-addressed samplers jump
//! straight to the draw they need instead of replaying a prefix.

use thiserror::Error;

use crate::lanes::{F64x8, U64x8, LANES};
use crate::mix::{fold_key, mix64, unit_f64, GOLDEN_GAMMA};

/// Longest accepted stream key, in bytes.
pub const MAX_KEY_LEN: usize = 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("bad stream key {key:?}: {reason}")]
    BadKey { key: String, reason: &'static str },
}

fn validate_key(key: &str) -> Result<(), StreamError> {
    if key.is_empty() {
        return Err(StreamError::BadKey {
            key: key.to_string(),
            reason: "empty",
        });
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StreamError::BadKey {
            key: key.to_string(),
            reason: "longer than MAX_KEY_LEN",
        });
    }
    if !key.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(StreamError::BadKey {
            key: key.to_string(),
            reason: "non-printable or non-ascii byte",
        });
    }
    Ok(())
}

/// Scalar stream; the reference implementation for the lane-wide form.
#[derive(Clone, Copy, Debug)]
pub struct Stream {
    state: u64,
    counter: u64,
}

impl Stream {
    pub fn new(key: &str, seed: &[u8]) -> Result<Self, StreamError> {
        validate_key(key)?;
        Ok(Self {
            state: fold_key(key.as_bytes(), seed),
            counter: 0,
        })
    }

    /// The `i`-th draw (0-based), independent of the cursor.
    #[inline(always)]
    pub fn draw_at(&self, i: u64) -> f64 {
        unit_f64(mix64(
            self.state ^ (i.wrapping_add(1)).wrapping_mul(GOLDEN_GAMMA),
        ))
    }

    /// Next sequential draw. Never fails.
    #[inline(always)]
    pub fn next(&mut self) -> f64 {
        let u = self.draw_at(self.counter);
        self.counter += 1;
        u
    }
}

/// Eight independent streams (one seed per lane) advanced in lockstep.
#[derive(Clone, Copy, Debug)]
pub struct StreamVec {
    state: U64x8,
    counter: u64,
}

impl StreamVec {
    pub fn new(key: &str, seeds: &[&[u8]; LANES]) -> Result<Self, StreamError> {
        validate_key(key)?;
        Ok(Self {
            state: U64x8::from_fn(|k| fold_key(key.as_bytes(), seeds[k])),
            counter: 0,
        })
    }

    /// The `i`-th draw for every lane.
    #[inline(always)]
    pub fn draw_at(&self, i: u64) -> F64x8 {
        let gamma = i.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA);
        let mixed = self.state.xor(U64x8::splat(gamma)).map(mix64);
        let mut out = [0.0f64; LANES];
        for k in 0..LANES {
            out[k] = unit_f64(mixed.0[k]);
        }
        F64x8(out)
    }

    /// Next sequential draw for every lane.
    #[inline(always)]
    pub fn next(&mut self) -> F64x8 {
        let u = self.draw_at(self.counter);
        self.counter += 1;
        u
    }
}
