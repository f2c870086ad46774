//! Per-domain sampling kernels.
//!
//! Each kernel maps keyed stream draws to domain values for eight seeds at
//! once. Draw indexing is positional: shop slot `s` (or pack slot `p`)
//! consumes draw `s` of each of its sub-streams, so evaluators can jump to
//! exactly the slots a clause names. Sub-draw ordering (rarity → identity →
//! edition) and the key spelling are part of the contract.

use cart_rng::{Mask8, StreamBank, StreamError, StreamId, StreamPlan, LANES};

use crate::items::{
    Boss, Edition, Enhancement, Joker, Planet, Rank, Rarity, Seal, Source, Spectral, Sticker,
    Suit, Tag, Tarot, Voucher, BOSS_FINISHER_START,
};
use crate::pools::PoolSet;

/// Antes are numbered 1..=ANTE_COUNT.
pub const ANTE_COUNT: u8 = 8;

/// The erratic generator draws a full 52-card starting deck.
pub const ERRATIC_DECK_SIZE: u64 = 52;

/// Gate probability for mega-gated soul appearances.
const MEGA_GATE: f64 = 0.15;

/// Shop slots available in an ante (the opening shop is smaller).
pub fn shop_slots_for(ante: u8) -> std::ops::Range<u8> {
    if ante <= 1 {
        0..4
    } else {
        0..6
    }
}

/// Pack slots available in an ante; same opening-ante cap as the shop.
pub fn pack_slots_for(ante: u8) -> std::ops::Range<u8> {
    if ante <= 1 {
        0..4
    } else {
        0..6
    }
}

fn keyed(tag: &str, ante: u8) -> String {
    format!("{tag}{ante}")
}

/// Per-ante voucher streams (identity + edition).
#[derive(Clone, Copy, Debug)]
pub struct VoucherKeys {
    id: StreamId,
    edition: StreamId,
}

impl VoucherKeys {
    pub fn declare(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Ok(Self {
            id: plan.declare(&keyed("Voucher", ante))?,
            edition: plan.declare(&keyed("VoucherEd", ante))?,
        })
    }

    /// The ante's voucher for every lane.
    #[inline]
    pub fn sample(
        &self,
        bank: &StreamBank,
        pools: &PoolSet,
    ) -> ([Voucher; LANES], [Edition; LANES]) {
        (
            pools.voucher.sample8(bank.draw(self.id, 0)),
            pools.consumable_edition.sample8(bank.draw(self.edition, 0)),
        )
    }
}

/// Per-ante tag stream; draw 0 is the small blind, draw 1 the big blind.
#[derive(Clone, Copy, Debug)]
pub struct TagKeys {
    id: StreamId,
}

impl TagKeys {
    pub fn declare(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Ok(Self {
            id: plan.declare(&keyed("Tag", ante))?,
        })
    }

    #[inline]
    pub fn sample(&self, bank: &StreamBank, pools: &PoolSet) -> ([Tag; LANES], [Tag; LANES]) {
        (
            pools.tag.sample8(bank.draw(self.id, 0)),
            pools.tag.sample8(bank.draw(self.id, 1)),
        )
    }
}

/// One joker draw for eight lanes.
#[derive(Clone, Copy, Debug)]
pub struct JokerDraw {
    pub joker: [Joker; LANES],
    pub edition: [Edition; LANES],
    pub sticker: [Sticker; LANES],
}

/// Streams behind one ante's joker draws for one source (shop or pack).
///
/// Rarity, the three per-rarity identity streams, edition, and sticker are
/// all distinct keys; slot `s` reads draw `s` of each.
#[derive(Clone, Copy, Debug)]
pub struct JokerKeys {
    rarity: StreamId,
    common: StreamId,
    uncommon: StreamId,
    rare: StreamId,
    edition: StreamId,
    sticker: StreamId,
}

impl JokerKeys {
    pub fn declare(plan: &mut StreamPlan, source: Source, ante: u8) -> Result<Self, StreamError> {
        let p = match source {
            Source::Shop => "",
            Source::Pack => "pak",
        };
        Ok(Self {
            rarity: plan.declare(&format!("{p}rarity{ante}"))?,
            common: plan.declare(&format!("{p}jokerC{ante}"))?,
            uncommon: plan.declare(&format!("{p}jokerU{ante}"))?,
            rare: plan.declare(&format!("{p}jokerR{ante}"))?,
            edition: plan.declare(&format!("{p}edition{ante}"))?,
            sticker: plan.declare(&format!("{p}sticker{ante}"))?,
        })
    }

    /// Sample slot `slot` for every lane: rarity roll, then the identity
    /// pool for that rarity, then the edition and sticker rolls.
    pub fn sample(&self, bank: &StreamBank, pools: &PoolSet, slot: u64) -> JokerDraw {
        let rarity = pools.rarity.sample8(bank.draw(self.rarity, slot));
        // All three identity streams are drawn at the slot index and the
        // lane's rarity picks between them; lanes stay independent without
        // divergent stream cursors.
        let common = pools.joker_common.sample8(bank.draw(self.common, slot));
        let uncommon = pools.joker_uncommon.sample8(bank.draw(self.uncommon, slot));
        let rare = pools.joker_rare.sample8(bank.draw(self.rare, slot));
        let edition = pools.shop_edition.sample8(bank.draw(self.edition, slot));
        let sticker = pools.sticker.sample8(bank.draw(self.sticker, slot));

        let mut joker = [Joker::TheJoker; LANES];
        for k in 0..LANES {
            joker[k] = match rarity[k] {
                Rarity::Common => common[k],
                Rarity::Uncommon => uncommon[k],
                Rarity::Rare => rare[k],
                Rarity::Legendary => unreachable!("legendaries never roll in the rarity pool"),
            };
        }
        JokerDraw {
            joker,
            edition,
            sticker,
        }
    }
}

/// One legendary (soul) draw for eight lanes.
#[derive(Clone, Copy, Debug)]
pub struct SoulDraw {
    pub joker: [Joker; LANES],
    pub edition: [Edition; LANES],
    /// Lanes whose appearance passed the mega gate.
    pub mega: Mask8,
}

/// Streams behind one ante's soul-joker draws.
#[derive(Clone, Copy, Debug)]
pub struct SoulKeys {
    soul: StreamId,
    edition: StreamId,
    mega: StreamId,
}

impl SoulKeys {
    pub fn declare(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Ok(Self {
            soul: plan.declare(&keyed("soul", ante))?,
            edition: plan.declare(&keyed("soulEd", ante))?,
            mega: plan.declare(&keyed("mega", ante))?,
        })
    }

    pub fn sample(&self, bank: &StreamBank, pools: &PoolSet, slot: u64) -> SoulDraw {
        let joker = pools.joker_legendary.sample8(bank.draw(self.soul, slot));
        let edition = pools.shop_edition.sample8(bank.draw(self.edition, slot));
        let mega = bank.draw(self.mega, slot).lt(MEGA_GATE);
        SoulDraw {
            joker,
            edition,
            mega,
        }
    }
}

/// Streams behind one consumable category (tarot, planet, spectral) in one
/// ante's packs.
#[derive(Clone, Copy, Debug)]
pub struct ConsumableKeys {
    item: StreamId,
    edition: StreamId,
}

impl ConsumableKeys {
    pub fn tarot(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Self::declare(plan, "Tarot", "TarotEd", ante)
    }

    pub fn planet(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Self::declare(plan, "Planet", "PlanetEd", ante)
    }

    pub fn spectral(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Self::declare(plan, "Spectral", "SpectralEd", ante)
    }

    fn declare(
        plan: &mut StreamPlan,
        item_tag: &str,
        edition_tag: &str,
        ante: u8,
    ) -> Result<Self, StreamError> {
        Ok(Self {
            item: plan.declare(&keyed(item_tag, ante))?,
            edition: plan.declare(&keyed(edition_tag, ante))?,
        })
    }

    pub fn sample_tarot(
        &self,
        bank: &StreamBank,
        pools: &PoolSet,
        slot: u64,
    ) -> ([Tarot; LANES], [Edition; LANES]) {
        (
            pools.tarot.sample8(bank.draw(self.item, slot)),
            pools.consumable_edition.sample8(bank.draw(self.edition, slot)),
        )
    }

    pub fn sample_planet(
        &self,
        bank: &StreamBank,
        pools: &PoolSet,
        slot: u64,
    ) -> ([Planet; LANES], [Edition; LANES]) {
        (
            pools.planet.sample8(bank.draw(self.item, slot)),
            pools.consumable_edition.sample8(bank.draw(self.edition, slot)),
        )
    }

    pub fn sample_spectral(
        &self,
        bank: &StreamBank,
        pools: &PoolSet,
        slot: u64,
    ) -> ([Spectral; LANES], [Edition; LANES]) {
        (
            pools.spectral.sample8(bank.draw(self.item, slot)),
            pools.consumable_edition.sample8(bank.draw(self.edition, slot)),
        )
    }
}

/// One playing-card draw for eight lanes.
#[derive(Clone, Copy, Debug)]
pub struct PlayingCardDraw {
    pub rank: [Rank; LANES],
    pub suit: [Suit; LANES],
    pub enhancement: [Enhancement; LANES],
    pub edition: [Edition; LANES],
    pub seal: [Seal; LANES],
}

/// Streams behind one ante's standard-pack playing cards.
#[derive(Clone, Copy, Debug)]
pub struct CardKeys {
    rank: StreamId,
    suit: StreamId,
    enhancement: StreamId,
    edition: StreamId,
    seal: StreamId,
}

impl CardKeys {
    pub fn declare(plan: &mut StreamPlan, ante: u8) -> Result<Self, StreamError> {
        Ok(Self {
            rank: plan.declare(&keyed("cardRank", ante))?,
            suit: plan.declare(&keyed("cardSuit", ante))?,
            enhancement: plan.declare(&keyed("cardEnh", ante))?,
            edition: plan.declare(&keyed("cardEd", ante))?,
            seal: plan.declare(&keyed("cardSeal", ante))?,
        })
    }

    pub fn sample(&self, bank: &StreamBank, pools: &PoolSet, slot: u64) -> PlayingCardDraw {
        PlayingCardDraw {
            rank: pools.rank.sample8(bank.draw(self.rank, slot)),
            suit: pools.suit.sample8(bank.draw(self.suit, slot)),
            enhancement: pools.enhancement.sample8(bank.draw(self.enhancement, slot)),
            edition: pools.consumable_edition.sample8(bank.draw(self.edition, slot)),
            seal: pools.seal.sample8(bank.draw(self.seal, slot)),
        }
    }
}

/// The full boss line for eight lanes, antes 1..=8.
#[derive(Clone, Copy, Debug)]
pub struct BossSchedule(pub [[Boss; LANES]; ANTE_COUNT as usize]);

impl BossSchedule {
    #[inline]
    pub fn at(&self, ante: u8, lane: usize) -> Boss {
        self.0[(ante - 1) as usize][lane]
    }
}

/// One stream per ante; history across antes keeps bosses from repeating.
#[derive(Clone, Copy, Debug)]
pub struct BossKeys {
    ids: [StreamId; ANTE_COUNT as usize],
}

impl BossKeys {
    pub fn declare(plan: &mut StreamPlan) -> Result<Self, StreamError> {
        let mut ids = [None; ANTE_COUNT as usize];
        for ante in 1..=ANTE_COUNT {
            ids[(ante - 1) as usize] = Some(plan.declare(&keyed("Boss", ante))?);
        }
        Ok(Self {
            ids: ids.map(|id| id.expect("all antes declared")),
        })
    }

    /// Walk all eight antes per lane. Antes 1..=7 draw from the regular
    /// rotation minus the lane's already-seen bosses (the set resets when it
    /// empties); ante 8 draws a finisher.
    pub fn schedule(&self, bank: &StreamBank) -> BossSchedule {
        let mut out = [[Boss::TheHook; LANES]; ANTE_COUNT as usize];
        let mut used = [0u32; LANES];
        for ante in 1..=ANTE_COUNT {
            let u = bank.draw(self.ids[(ante - 1) as usize], 0);
            for k in 0..LANES {
                out[(ante - 1) as usize][k] = pick_boss(ante, u.lane(k), &mut used[k]);
            }
        }
        BossSchedule(out)
    }
}

pub(crate) fn pick_boss(ante: u8, u: f64, used: &mut u32) -> Boss {
    let (lo, hi) = if ante >= ANTE_COUNT {
        (BOSS_FINISHER_START as usize, Boss::COUNT)
    } else {
        (0, BOSS_FINISHER_START as usize)
    };
    let class_mask = ((1u64 << hi) - (1u64 << lo)) as u32;
    if *used & class_mask == class_mask {
        // Whole class exhausted: the window resets.
        *used &= !class_mask;
    }
    // Fixed scratch; no heap on the hot path.
    let mut eligible = [Boss::TheHook; Boss::COUNT];
    let mut n = 0usize;
    for &b in &Boss::ALL[lo..hi] {
        if *used & (1 << b.ordinal()) == 0 {
            eligible[n] = b;
            n += 1;
        }
    }
    let idx = ((u * n as f64) as usize).min(n - 1);
    let chosen = eligible[idx];
    *used |= 1 << chosen.ordinal();
    chosen
}

/// Streams behind the erratic starting deck; ante-free.
#[derive(Clone, Copy, Debug)]
pub struct ErraticKeys {
    rank: StreamId,
    suit: StreamId,
}

impl ErraticKeys {
    pub fn declare(plan: &mut StreamPlan) -> Result<Self, StreamError> {
        Ok(Self {
            rank: plan.declare("erRank")?,
            suit: plan.declare("erSuit")?,
        })
    }

    /// Card `i` (0..52) of the erratic starting deck: independent rank and
    /// suit rolls.
    #[inline]
    pub fn card(
        &self,
        bank: &StreamBank,
        pools: &PoolSet,
        i: u64,
    ) -> ([Rank; LANES], [Suit; LANES]) {
        (
            pools.rank.sample8(bank.draw(self.rank, i)),
            pools.suit.sample8(bank.draw(self.suit, i)),
        )
    }
}
