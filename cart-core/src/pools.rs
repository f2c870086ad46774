//! Weighted pools and the per-run pool set.
//!
//! A pool is an ordered `(value, weight)` table with prefix sums. The last
//! prefix sum is inflated so any `u ∈ [0, 1)` terminates inside the table
//! even under floating-point drift.

use cart_rng::{F64x8, LANES};

use crate::items::{
    Deck, Edition, Enhancement, Joker, Planet, Rank, Rarity, Seal, Spectral, Stake, Sticker,
    Suit, Tag, Tarot, Voucher,
};

/// Ordered weighted table; immutable once built.
#[derive(Clone, Debug)]
pub struct Pool<T: Copy> {
    values: Vec<T>,
    cumulative: Vec<f64>,
    total: f64,
}

impl<T: Copy> Pool<T> {
    pub fn new(entries: &[(T, f64)]) -> Self {
        assert!(!entries.is_empty(), "empty pool");
        let mut values = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut acc = 0.0f64;
        for &(v, w) in entries {
            assert!(w > 0.0 && w.is_finite(), "pool weight must be positive");
            acc += w;
            values.push(v);
            cumulative.push(acc);
        }
        let total = acc;
        // Inflate the tail so the prefix-sum walk is total for any u < 1.
        *cumulative.last_mut().expect("nonempty") = total * 2.0;
        Self {
            values,
            cumulative,
            total,
        }
    }

    pub fn uniform(items: &[T]) -> Self {
        let entries: Vec<(T, f64)> = items.iter().map(|&v| (v, 1.0)).collect();
        Self::new(&entries)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First entry whose cumulative weight exceeds `u`-scaled total.
    #[inline]
    pub fn sample(&self, u: f64) -> T {
        let target = u * self.total;
        for (i, &c) in self.cumulative.iter().enumerate() {
            if target < c {
                return self.values[i];
            }
        }
        unreachable!("inflated tail makes the walk total")
    }

    /// Eight draws in one pass; lanes that have chosen are frozen.
    #[inline]
    pub fn sample8(&self, u: F64x8) -> [T; LANES] {
        let mut out = [self.values[0]; LANES];
        let mut chosen: u8 = 0;
        let mut target = [0.0f64; LANES];
        for k in 0..LANES {
            target[k] = u.lane(k) * self.total;
        }
        for (i, &c) in self.cumulative.iter().enumerate() {
            if chosen == 0xFF {
                break;
            }
            for k in 0..LANES {
                if (chosen >> k) & 1 == 0 && target[k] < c {
                    out[k] = self.values[i];
                    chosen |= 1 << k;
                }
            }
        }
        debug_assert_eq!(chosen, 0xFF, "inflated tail makes the walk total");
        out
    }
}

/// Every pool one run needs, conditioned on deck and stake.
///
/// Built once per search and shared immutably; evaluators borrow, never own.
#[derive(Clone, Debug)]
pub struct PoolSet {
    pub deck: Deck,
    pub stake: Stake,
    pub rarity: Pool<Rarity>,
    pub joker_common: Pool<Joker>,
    pub joker_uncommon: Pool<Joker>,
    pub joker_rare: Pool<Joker>,
    pub joker_legendary: Pool<Joker>,
    pub shop_edition: Pool<Edition>,
    pub consumable_edition: Pool<Edition>,
    pub sticker: Pool<Sticker>,
    pub voucher: Pool<Voucher>,
    pub tag: Pool<Tag>,
    pub tarot: Pool<Tarot>,
    pub planet: Pool<Planet>,
    pub spectral: Pool<Spectral>,
    pub rank: Pool<Rank>,
    pub suit: Pool<Suit>,
    pub enhancement: Pool<Enhancement>,
    pub seal: Pool<Seal>,
}

impl PoolSet {
    pub fn for_run(deck: Deck, stake: Stake) -> Self {
        // Shop rarity split. Legendaries never roll here; they arrive only
        // through the dedicated soul stream.
        let rarity = Pool::new(&[
            (Rarity::Common, 0.70),
            (Rarity::Uncommon, 0.25),
            (Rarity::Rare, 0.05),
        ]);

        // Higher stakes open the Negative slot in the shop edition roll.
        let shop_edition = if stake.ordinal() >= Stake::Green.ordinal() {
            Pool::new(&[
                (Edition::None, 0.947),
                (Edition::Foil, 0.020),
                (Edition::Holo, 0.014),
                (Edition::Polychrome, 0.006),
                (Edition::Negative, 0.013),
            ])
        } else {
            Pool::new(&[
                (Edition::None, 0.960),
                (Edition::Foil, 0.020),
                (Edition::Holo, 0.014),
                (Edition::Polychrome, 0.006),
            ])
        };

        let consumable_edition = Pool::new(&[(Edition::None, 0.98), (Edition::Negative, 0.02)]);

        // Stickers unlock with stake: Eternal at Black, Perishable at Blue,
        // Rental at Orange.
        let sticker = if stake.ordinal() >= Stake::Orange.ordinal() {
            Pool::new(&[
                (Sticker::None, 0.40),
                (Sticker::Eternal, 0.30),
                (Sticker::Perishable, 0.20),
                (Sticker::Rental, 0.10),
            ])
        } else if stake.ordinal() >= Stake::Blue.ordinal() {
            Pool::new(&[
                (Sticker::None, 0.50),
                (Sticker::Eternal, 0.30),
                (Sticker::Perishable, 0.20),
            ])
        } else if stake.ordinal() >= Stake::Black.ordinal() {
            Pool::new(&[(Sticker::None, 0.70), (Sticker::Eternal, 0.30)])
        } else {
            Pool::new(&[(Sticker::None, 1.0)])
        };

        // Most playing cards are plain; enhancements and seals are rare.
        let enhancement = Pool::new(&[
            (Enhancement::None, 0.60),
            (Enhancement::Bonus, 0.08),
            (Enhancement::Mult, 0.08),
            (Enhancement::Wild, 0.06),
            (Enhancement::Glass, 0.04),
            (Enhancement::Steel, 0.04),
            (Enhancement::Stone, 0.04),
            (Enhancement::Gold, 0.03),
            (Enhancement::Lucky, 0.03),
        ]);
        let seal = Pool::new(&[
            (Seal::None, 0.92),
            (Seal::Red, 0.02),
            (Seal::Blue, 0.02),
            (Seal::Gold, 0.02),
            (Seal::Purple, 0.02),
        ]);

        Self {
            deck,
            stake,
            rarity,
            joker_common: Pool::uniform(Joker::of_rarity(Rarity::Common)),
            joker_uncommon: Pool::uniform(Joker::of_rarity(Rarity::Uncommon)),
            joker_rare: Pool::uniform(Joker::of_rarity(Rarity::Rare)),
            joker_legendary: Pool::uniform(Joker::of_rarity(Rarity::Legendary)),
            shop_edition,
            consumable_edition,
            sticker,
            voucher: Pool::uniform(Voucher::ALL),
            tag: Pool::uniform(Tag::ALL),
            tarot: Pool::uniform(Tarot::ALL),
            planet: Pool::uniform(Planet::ALL),
            spectral: Pool::uniform(Spectral::ALL),
            rank: Pool::uniform(Rank::ALL),
            suit: Pool::uniform(Suit::ALL),
            enhancement,
            seal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_rng::F64x8;

    #[test]
    fn sample_terminates_for_all_u() {
        let pool = Pool::new(&[("a", 1.0), ("b", 2.0), ("c", 0.5)]);
        // Boundary draws, including the largest double below 1.
        for u in [0.0, 0.25, 0.5, 0.999_999, 1.0 - f64::EPSILON] {
            let _ = pool.sample(u);
        }
        assert_eq!(pool.sample(0.0), "a");
        assert_eq!(pool.sample(1.0 - f64::EPSILON), "c");
    }

    #[test]
    fn sample_respects_weights() {
        let pool = Pool::new(&[(0u8, 3.0), (1u8, 1.0)]);
        // total 4; u*4 < 3 -> first entry.
        assert_eq!(pool.sample(0.74), 0);
        assert_eq!(pool.sample(0.76), 1);
    }

    #[test]
    fn sample8_matches_scalar() {
        let pool = Pool::new(&[(10u8, 0.3), (20u8, 0.5), (30u8, 0.2)]);
        let u = F64x8([0.0, 0.1, 0.29, 0.3, 0.5, 0.79, 0.8, 0.999]);
        let v = pool.sample8(u);
        for k in 0..LANES {
            assert_eq!(v[k], pool.sample(u.lane(k)), "lane {k}");
        }
    }

    #[test]
    fn uniform_pool_is_even() {
        let pool = Pool::uniform(&[1, 2, 3, 4, 5]);
        assert_eq!(pool.sample(0.0), 1);
        assert_eq!(pool.sample(0.19), 1);
        assert_eq!(pool.sample(0.21), 2);
        assert_eq!(pool.sample(0.99), 5);
    }

    #[test]
    fn pool_set_shapes() {
        let ps = PoolSet::for_run(Deck::Red, Stake::White);
        assert_eq!(ps.joker_common.len(), 61);
        assert_eq!(ps.joker_uncommon.len(), 64);
        assert_eq!(ps.joker_rare.len(), 20);
        assert_eq!(ps.joker_legendary.len(), 5);
        assert_eq!(ps.voucher.len(), 32);
        assert_eq!(ps.tag.len(), 24);
        assert_eq!(ps.tarot.len(), 22);
        assert_eq!(ps.planet.len(), 12);
        assert_eq!(ps.spectral.len(), 18);
        // White stake has no Negative in the shop roll; Green does.
        assert_eq!(ps.shop_edition.len(), 4);
        let hi = PoolSet::for_run(Deck::Red, Stake::Green);
        assert_eq!(hi.shop_edition.len(), 5);
        // Stickers unlock stepwise with stake.
        assert_eq!(ps.sticker.len(), 1);
        assert_eq!(PoolSet::for_run(Deck::Red, Stake::Black).sticker.len(), 2);
        assert_eq!(PoolSet::for_run(Deck::Red, Stake::Gold).sticker.len(), 4);
    }
}
