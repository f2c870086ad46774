//! cart-core: game domain tables and deterministic sampling kernels.
//!
//! This crate is the single place that defines what a seed *means*: the
//! closed item sets with their fixed ordinals, the weighted pools, and the
//! per-domain kernels that turn keyed stream draws into shop, pack, tag,
//! boss, deck, and event outcomes. Everything here is pure and deterministic;
//! the kernels operate on eight seeds at a time via `cart-rng` lane vectors.

pub mod analyze;
pub mod events;
pub mod items;
pub mod kernels;
pub mod pools;
pub mod seed;

#[cfg(test)]
mod kernels_tests;

pub use analyze::{analyze, Analysis, AnteReport};
pub use events::EventCheck;
pub use items::{
    fold_name, Boss, Deck, Edition, Enhancement, Joker, Planet, Rank, Rarity, Seal, Source,
    Spectral, Stake, Sticker, Suit, Tag, Tarot, Voucher,
};
pub use kernels::{
    pack_slots_for, shop_slots_for, BossKeys, BossSchedule, CardKeys, ConsumableKeys,
    ErraticKeys, JokerDraw, JokerKeys, PlayingCardDraw, SoulDraw, SoulKeys, TagKeys,
    VoucherKeys, ANTE_COUNT, ERRATIC_DECK_SIZE,
};
pub use pools::{Pool, PoolSet};
pub use seed::{Seed, SeedError, ALPHABET, ALPHABET_LEN, SEED_LEN};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
