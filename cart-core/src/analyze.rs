//! Single-seed analysis: the full generative dump one seed produces.
//!
//! Drives the same lane-wide kernels as the search path (seed splatted
//! across all eight lanes, lane 0 reported), so what `analyze` prints is
//! exactly what the filter evaluators see.

use serde::Serialize;

use cart_rng::{StreamBank, StreamError, StreamPlan};

use crate::events::EventCheck;
use crate::items::{
    Boss, Deck, Edition, Enhancement, Rank, Seal, Source, Stake, Sticker, Suit, Tag, Voucher,
};
use crate::kernels::{
    pack_slots_for, shop_slots_for, BossKeys, CardKeys, ConsumableKeys, ErraticKeys, JokerKeys,
    SoulKeys, TagKeys, VoucherKeys, ANTE_COUNT, ERRATIC_DECK_SIZE,
};
use crate::pools::PoolSet;
use crate::seed::Seed;

#[derive(Debug, Clone, Serialize)]
pub struct ItemWithEdition {
    pub name: String,
    pub edition: Edition,
}

#[derive(Debug, Clone, Serialize)]
pub struct JokerReport {
    pub name: String,
    pub edition: Edition,
    pub sticker: Sticker,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayingCardReport {
    pub rank: Rank,
    pub suit: Suit,
    pub enhancement: Enhancement,
    pub edition: Edition,
    pub seal: Seal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnteReport {
    pub ante: u8,
    pub voucher: Voucher,
    pub voucher_edition: Edition,
    pub small_blind_tag: Tag,
    pub big_blind_tag: Tag,
    pub boss: Boss,
    pub shop_jokers: Vec<JokerReport>,
    pub pack_jokers: Vec<JokerReport>,
    pub soul_joker: ItemWithEdition,
    pub tarots: Vec<ItemWithEdition>,
    pub planets: Vec<ItemWithEdition>,
    pub spectrals: Vec<ItemWithEdition>,
    pub playing_cards: Vec<PlayingCardReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub outcome: String,
    pub hit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub seed: Seed,
    pub deck: Deck,
    pub stake: Stake,
    pub antes: Vec<AnteReport>,
    /// Index-0 roll of every event outcome.
    pub events: Vec<EventReport>,
    /// 52 cards, present only for the Erratic deck.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erratic_deck: Option<Vec<PlayingCardSummary>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayingCardSummary {
    pub rank: Rank,
    pub suit: Suit,
}

/// Produce the full per-ante dump for one seed.
pub fn analyze(seed: Seed, deck: Deck, stake: Stake) -> Result<Analysis, StreamError> {
    let pools = PoolSet::for_run(deck, stake);
    let mut plan = StreamPlan::new();

    let mut vouchers = Vec::new();
    let mut tags = Vec::new();
    let mut shop_jokers = Vec::new();
    let mut pack_jokers = Vec::new();
    let mut souls = Vec::new();
    let mut tarots = Vec::new();
    let mut planets = Vec::new();
    let mut spectrals = Vec::new();
    let mut cards = Vec::new();
    for ante in 1..=ANTE_COUNT {
        vouchers.push(VoucherKeys::declare(&mut plan, ante)?);
        tags.push(TagKeys::declare(&mut plan, ante)?);
        shop_jokers.push(JokerKeys::declare(&mut plan, Source::Shop, ante)?);
        pack_jokers.push(JokerKeys::declare(&mut plan, Source::Pack, ante)?);
        souls.push(SoulKeys::declare(&mut plan, ante)?);
        tarots.push(ConsumableKeys::tarot(&mut plan, ante)?);
        planets.push(ConsumableKeys::planet(&mut plan, ante)?);
        spectrals.push(ConsumableKeys::spectral(&mut plan, ante)?);
        cards.push(CardKeys::declare(&mut plan, ante)?);
    }
    let bosses = BossKeys::declare(&mut plan)?;
    let erratic = ErraticKeys::declare(&mut plan)?;
    let event_ids: Vec<_> = EventCheck::ALL
        .iter()
        .map(|c| c.declare(&mut plan))
        .collect::<Result<_, _>>()?;
    plan.freeze();

    let bytes = seed.as_bytes();
    let seeds: [&[u8]; 8] = [&bytes[..]; 8];
    let bank = StreamBank::build(&plan, &seeds);
    let boss_line = bosses.schedule(&bank);

    let mut antes = Vec::with_capacity(ANTE_COUNT as usize);
    for ante in 1..=ANTE_COUNT {
        let a = (ante - 1) as usize;
        let (small, big) = tags[a].sample(&bank, &pools);

        let mut shop = Vec::new();
        for slot in shop_slots_for(ante) {
            let d = shop_jokers[a].sample(&bank, &pools, slot as u64);
            shop.push(JokerReport {
                name: d.joker[0].name().to_string(),
                edition: d.edition[0],
                sticker: d.sticker[0],
            });
        }

        let mut from_packs = Vec::new();
        let mut tarot_out = Vec::new();
        let mut planet_out = Vec::new();
        let mut spectral_out = Vec::new();
        let mut card_out = Vec::new();
        for slot in pack_slots_for(ante) {
            let slot = slot as u64;
            let d = pack_jokers[a].sample(&bank, &pools, slot);
            from_packs.push(JokerReport {
                name: d.joker[0].name().to_string(),
                edition: d.edition[0],
                sticker: d.sticker[0],
            });
            let (t, te) = tarots[a].sample_tarot(&bank, &pools, slot);
            tarot_out.push(ItemWithEdition {
                name: t[0].name().to_string(),
                edition: te[0],
            });
            let (p, pe) = planets[a].sample_planet(&bank, &pools, slot);
            planet_out.push(ItemWithEdition {
                name: p[0].name().to_string(),
                edition: pe[0],
            });
            let (s, se) = spectrals[a].sample_spectral(&bank, &pools, slot);
            spectral_out.push(ItemWithEdition {
                name: s[0].name().to_string(),
                edition: se[0],
            });
            let c = cards[a].sample(&bank, &pools, slot);
            card_out.push(PlayingCardReport {
                rank: c.rank[0],
                suit: c.suit[0],
                enhancement: c.enhancement[0],
                edition: c.edition[0],
                seal: c.seal[0],
            });
        }

        let soul = souls[a].sample(&bank, &pools, 0);

        let (voucher, voucher_ed) = vouchers[a].sample(&bank, &pools);
        antes.push(AnteReport {
            ante,
            voucher: voucher[0],
            voucher_edition: voucher_ed[0],
            small_blind_tag: small[0],
            big_blind_tag: big[0],
            boss: boss_line.at(ante, 0),
            shop_jokers: shop,
            pack_jokers: from_packs,
            soul_joker: ItemWithEdition {
                name: soul.joker[0].name().to_string(),
                edition: soul.edition[0],
            },
            tarots: tarot_out,
            planets: planet_out,
            spectrals: spectral_out,
            playing_cards: card_out,
        });
    }

    let events = EventCheck::ALL
        .iter()
        .zip(event_ids.iter())
        .map(|(c, &id)| EventReport {
            outcome: c.name().to_string(),
            hit: c.matches(bank.draw(id, 0).lane(0)),
        })
        .collect();

    let erratic_deck = if deck == Deck::Erratic {
        let mut deck_cards = Vec::with_capacity(ERRATIC_DECK_SIZE as usize);
        for i in 0..ERRATIC_DECK_SIZE {
            let (r, s) = erratic.card(&bank, &pools, i);
            deck_cards.push(PlayingCardSummary {
                rank: r[0],
                suit: s[0],
            });
        }
        Some(deck_cards)
    } else {
        None
    };

    Ok(Analysis {
        seed,
        deck,
        stake,
        antes,
        events,
        erratic_deck,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_is_deterministic() {
        let seed = Seed::parse("CART1234").unwrap();
        let a = analyze(seed, Deck::Red, Stake::White).unwrap();
        let b = analyze(seed, Deck::Red, Stake::White).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn ante_one_has_the_small_shop() {
        let seed = Seed::parse("AAAAAAAA").unwrap();
        let a = analyze(seed, Deck::Red, Stake::White).unwrap();
        assert_eq!(a.antes.len(), 8);
        assert_eq!(a.antes[0].shop_jokers.len(), 4);
        assert_eq!(a.antes[1].shop_jokers.len(), 6);
    }

    #[test]
    fn erratic_deck_only_for_erratic() {
        let seed = Seed::parse("AAAAAAAA").unwrap();
        let plain = analyze(seed, Deck::Red, Stake::White).unwrap();
        assert!(plain.erratic_deck.is_none());
        let erratic = analyze(seed, Deck::Erratic, Stake::White).unwrap();
        assert_eq!(erratic.erratic_deck.unwrap().len(), 52);
    }

    #[test]
    fn finisher_boss_on_ante_eight() {
        for raw in ["AAAAAAAA", "CART1234", "ZZZZZZZZ", "7SLMX2E9"] {
            let seed = Seed::parse(raw).unwrap();
            let a = analyze(seed, Deck::Red, Stake::White).unwrap();
            assert!(a.antes[7].boss.is_finisher(), "seed {raw}");
            for ante in 0..7 {
                assert!(!a.antes[ante].boss.is_finisher(), "seed {raw} ante {ante}");
            }
        }
    }
}
