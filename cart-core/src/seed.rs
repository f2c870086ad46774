//! Seed strings and their position in the base-35 lattice.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Canonical seed alphabet; the ordinal of a character is its index here.
pub const ALPHABET: &[u8; 35] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789";

/// Alphabet arity as a u64, for lattice arithmetic.
pub const ALPHABET_LEN: u64 = ALPHABET.len() as u64;

/// Seeds are exactly eight characters.
pub const SEED_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("seed must be {SEED_LEN} characters, got {0}")]
    BadLength(usize),
    #[error("seed character {ch:?} at position {pos} is outside the alphabet")]
    BadChar { ch: char, pos: usize },
}

/// Ordinal of an upper-cased alphabet byte, or `None` for foreign bytes.
#[inline]
pub fn ordinal_of(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'1'..=b'9' => Some(26 + b - b'1'),
        _ => None,
    }
}

/// An immutable eight-character seed in canonical (upper-case) form.
///
/// Ordering follows the lattice (alphabet ordinals), not raw bytes: digits
/// sort after `Z`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed([u8; SEED_LEN]);

impl PartialOrd for Seed {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Seed {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index().cmp(&other.index())
    }
}

impl Seed {
    /// Parse user input; case-insensitive, canonicalized to upper-case.
    pub fn parse(s: &str) -> Result<Self, SeedError> {
        if s.len() != SEED_LEN {
            return Err(SeedError::BadLength(s.chars().count()));
        }
        let mut out = [0u8; SEED_LEN];
        for (pos, ch) in s.bytes().enumerate() {
            let up = ch.to_ascii_uppercase();
            if ordinal_of(up).is_none() {
                return Err(SeedError::BadChar {
                    ch: ch as char,
                    pos,
                });
            }
            out[pos] = up;
        }
        Ok(Seed(out))
    }

    /// The seed at lattice position `idx` (big-endian base-35).
    pub fn from_index(mut idx: u64) -> Self {
        let mut out = [ALPHABET[0]; SEED_LEN];
        for pos in (0..SEED_LEN).rev() {
            out[pos] = ALPHABET[(idx % ALPHABET_LEN) as usize];
            idx /= ALPHABET_LEN;
        }
        Seed(out)
    }

    /// Lattice position of this seed.
    pub fn index(&self) -> u64 {
        self.0
            .iter()
            .fold(0u64, |acc, &b| {
                acc * ALPHABET_LEN + ordinal_of(b).expect("canonical seeds are in-alphabet") as u64
            })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("seed bytes are ascii")
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seed({})", self.as_str())
    }
}

impl std::str::FromStr for Seed {
    type Err = SeedError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Seed::parse(s)
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Seed::parse(&s).map_err(serde::de::Error::custom)
    }
}
