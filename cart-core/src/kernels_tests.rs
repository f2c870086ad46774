#[cfg(test)]
mod tests {
    use crate::items::{Boss, Deck, Rarity, Source, Stake};
    use crate::kernels::*;
    use crate::pools::PoolSet;
    use cart_rng::{Stream, StreamBank, StreamPlan, LANES};

    const SEEDS: [&[u8]; LANES] = [
        b"AAAAAAAA", b"7SLMX2E9", b"ZZZZZZZZ", b"CART1234", b"Q2W3E4R5", b"NINELIVE",
        b"B4TCHMAN", b"99999999",
    ];

    fn bank_with<T>(declare: impl FnOnce(&mut StreamPlan) -> T) -> (T, StreamBank) {
        let mut plan = StreamPlan::new();
        let keys = declare(&mut plan);
        plan.freeze();
        let bank = StreamBank::build(&plan, &SEEDS);
        (keys, bank)
    }

    #[test]
    fn voucher_kernel_matches_scalar_reference() {
        let pools = PoolSet::for_run(Deck::Red, Stake::White);
        let (keys, bank) = bank_with(|p| VoucherKeys::declare(p, 3).unwrap());
        let (got, eds) = keys.sample(&bank, &pools);
        for (k, seed) in SEEDS.iter().enumerate() {
            let s = Stream::new("Voucher3", seed).unwrap();
            assert_eq!(got[k], pools.voucher.sample(s.draw_at(0)), "lane {k}");
            let e = Stream::new("VoucherEd3", seed).unwrap();
            assert_eq!(
                eds[k],
                pools.consumable_edition.sample(e.draw_at(0)),
                "lane {k} edition"
            );
        }
    }

    #[test]
    fn tag_kernel_draw_order_is_small_then_big() {
        let pools = PoolSet::for_run(Deck::Red, Stake::White);
        let (keys, bank) = bank_with(|p| TagKeys::declare(p, 1).unwrap());
        let (small, big) = keys.sample(&bank, &pools);
        for (k, seed) in SEEDS.iter().enumerate() {
            let s = Stream::new("Tag1", seed).unwrap();
            assert_eq!(small[k], pools.tag.sample(s.draw_at(0)), "lane {k} small");
            assert_eq!(big[k], pools.tag.sample(s.draw_at(1)), "lane {k} big");
        }
    }

    #[test]
    fn joker_kernel_matches_scalar_reference() {
        let pools = PoolSet::for_run(Deck::Red, Stake::White);
        let (keys, bank) = bank_with(|p| JokerKeys::declare(p, Source::Shop, 2).unwrap());
        for slot in 0..6u64 {
            let d = keys.sample(&bank, &pools, slot);
            for (k, seed) in SEEDS.iter().enumerate() {
                let rarity = pools
                    .rarity
                    .sample(Stream::new("rarity2", seed).unwrap().draw_at(slot));
                let want = match rarity {
                    Rarity::Common => pools
                        .joker_common
                        .sample(Stream::new("jokerC2", seed).unwrap().draw_at(slot)),
                    Rarity::Uncommon => pools
                        .joker_uncommon
                        .sample(Stream::new("jokerU2", seed).unwrap().draw_at(slot)),
                    Rarity::Rare => pools
                        .joker_rare
                        .sample(Stream::new("jokerR2", seed).unwrap().draw_at(slot)),
                    Rarity::Legendary => unreachable!(),
                };
                assert_eq!(d.joker[k], want, "lane {k} slot {slot}");
                assert_eq!(d.joker[k].rarity(), rarity, "lane {k} slot {slot}");
                let ed = pools
                    .shop_edition
                    .sample(Stream::new("edition2", seed).unwrap().draw_at(slot));
                assert_eq!(d.edition[k], ed, "lane {k} slot {slot} edition");
                let st = pools
                    .sticker
                    .sample(Stream::new("sticker2", seed).unwrap().draw_at(slot));
                assert_eq!(d.sticker[k], st, "lane {k} slot {slot} sticker");
            }
        }
    }

    #[test]
    fn shop_and_pack_jokers_are_independent_streams() {
        let pools = PoolSet::for_run(Deck::Red, Stake::White);
        let (keys, bank) = bank_with(|p| {
            (
                JokerKeys::declare(p, Source::Shop, 2).unwrap(),
                JokerKeys::declare(p, Source::Pack, 2).unwrap(),
            )
        });
        let shop = keys.0.sample(&bank, &pools, 0);
        let pack = keys.1.sample(&bank, &pools, 0);
        // Same ante, same slot, different sources: the draws must differ for
        // at least some lanes (equal streams would match on all eight).
        assert_ne!(shop.joker, pack.joker);
    }

    #[test]
    fn soul_kernel_is_legendary_only() {
        let pools = PoolSet::for_run(Deck::Red, Stake::White);
        let (keys, bank) = bank_with(|p| SoulKeys::declare(p, 5).unwrap());
        for slot in 0..6u64 {
            let d = keys.sample(&bank, &pools, slot);
            for k in 0..LANES {
                assert_eq!(d.joker[k].rarity(), Rarity::Legendary, "lane {k}");
            }
        }
    }

    #[test]
    fn boss_schedule_never_repeats_within_a_run() {
        let (keys, bank) = bank_with(|p| BossKeys::declare(p).unwrap());
        let sched = keys.schedule(&bank);
        for k in 0..LANES {
            let mut seen = std::collections::HashSet::new();
            for ante in 1..=ANTE_COUNT {
                let b = sched.at(ante, k);
                assert!(seen.insert(b), "lane {k}: {b} repeated");
                if ante == ANTE_COUNT {
                    assert!(b.is_finisher(), "lane {k}: ante 8 must be a finisher");
                } else {
                    assert!(!b.is_finisher(), "lane {k} ante {ante}: early finisher");
                }
            }
        }
    }

    #[test]
    fn boss_window_resets_when_exhausted() {
        // Drain the regular class: after 23 picks every regular has been
        // seen once, and pick 24 must still succeed.
        let mut used = 0u32;
        let mut seen = std::collections::HashSet::new();
        for i in 0..Boss::regulars().len() {
            let u = (i as f64) / 40.0;
            let b = crate::kernels::pick_boss(3, u, &mut used);
            assert!(!b.is_finisher());
            seen.insert(b);
        }
        assert_eq!(seen.len(), Boss::regulars().len());
        let again = crate::kernels::pick_boss(3, 0.0, &mut used);
        assert!(!again.is_finisher());
    }

    #[test]
    fn erratic_cards_match_scalar_reference() {
        let pools = PoolSet::for_run(Deck::Erratic, Stake::White);
        let (keys, bank) = bank_with(|p| ErraticKeys::declare(p).unwrap());
        for i in [0u64, 1, 17, 51] {
            let (ranks, suits) = keys.card(&bank, &pools, i);
            for (k, seed) in SEEDS.iter().enumerate() {
                let r = Stream::new("erRank", seed).unwrap();
                let s = Stream::new("erSuit", seed).unwrap();
                assert_eq!(ranks[k], pools.rank.sample(r.draw_at(i)), "lane {k} card {i}");
                assert_eq!(suits[k], pools.suit.sample(s.draw_at(i)), "lane {k} card {i}");
            }
        }
    }

    #[test]
    fn playing_card_kernel_uses_distinct_streams() {
        let pools = PoolSet::for_run(Deck::Red, Stake::White);
        let (keys, bank) = bank_with(|p| CardKeys::declare(p, 4).unwrap());
        let d = keys.sample(&bank, &pools, 0);
        for (k, seed) in SEEDS.iter().enumerate() {
            let r = Stream::new("cardRank4", seed).unwrap();
            assert_eq!(d.rank[k], pools.rank.sample(r.draw_at(0)), "lane {k}");
            let s = Stream::new("cardSuit4", seed).unwrap();
            assert_eq!(d.suit[k], pools.suit.sample(s.draw_at(0)), "lane {k}");
        }
    }

    #[test]
    fn slot_ranges_cap_the_opening_ante() {
        assert_eq!(shop_slots_for(1), 0..4);
        assert_eq!(shop_slots_for(2), 0..6);
        assert_eq!(pack_slots_for(1), 0..4);
        assert_eq!(pack_slots_for(8), 0..6);
    }
}
