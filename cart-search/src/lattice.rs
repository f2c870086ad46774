//! Batch geometry over the base-35 seed lattice.
//!
//! `batch_chars = L` means one batch enumerates the 35^L seeds that share an
//! (8−L)-character prefix; the batch index is the base-35 encoding of that
//! prefix. Seed index arithmetic is exact: batch `b`, offset `s` is lattice
//! position `b · 35^L + s`.

use cart_core::{Seed, ALPHABET_LEN, SEED_LEN};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LatticeError {
    #[error("batch character count must be in 1..=8, got {0}")]
    BadChars(u8),
}

#[derive(Clone, Copy, Debug)]
pub struct Lattice {
    chars: u8,
    seeds_per_batch: u64,
    batch_count: u64,
}

impl Lattice {
    pub fn new(chars: u8) -> Result<Self, LatticeError> {
        if !(1..=SEED_LEN as u8).contains(&chars) {
            return Err(LatticeError::BadChars(chars));
        }
        Ok(Self {
            chars,
            seeds_per_batch: ALPHABET_LEN.pow(chars as u32),
            batch_count: ALPHABET_LEN.pow(SEED_LEN as u32 - chars as u32),
        })
    }

    pub fn chars(&self) -> u8 {
        self.chars
    }

    /// Suffix seeds under one prefix: 35^L.
    pub fn seeds_per_batch(&self) -> u64 {
        self.seeds_per_batch
    }

    /// Number of prefixes: 35^(8−L).
    pub fn batch_count(&self) -> u64 {
        self.batch_count
    }

    /// The seed at `offset` within batch `batch`.
    #[inline]
    pub fn seed(&self, batch: u64, offset: u64) -> Seed {
        debug_assert!(batch < self.batch_count && offset < self.seeds_per_batch);
        Seed::from_index(batch * self.seeds_per_batch + offset)
    }
}
