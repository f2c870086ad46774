#[cfg(test)]
mod tests {
    use crate::compile::{compile, CompiledFilter, LaneOutcome, NO_CUTOFF};
    use crate::doc::{DocFormat, FilterDoc};
    use cart_core::{Edition, Joker, Rarity, Seed, Voucher};
    use cart_rng::{Mask8, Stream, StreamBank, LANES};

    const SEEDS: [&str; LANES] = [
        "AAAAAAAA", "7SLMX2E9", "ZZZZZZZZ", "CART1234", "Q2W3E4R5", "NINELIVE", "B4TCHMAN",
        "99999999",
    ];

    fn cf(json: &str) -> CompiledFilter {
        compile(&FilterDoc::from_str(json, DocFormat::Json).unwrap()).unwrap()
    }

    fn eval(cf: &CompiledFilter, seeds: [&str; LANES], cutoff: i64) -> LaneOutcome {
        let parsed: Vec<Seed> = seeds.iter().map(|s| Seed::parse(s).unwrap()).collect();
        let bytes: [&[u8]; LANES] = std::array::from_fn(|k| &parsed[k].as_bytes()[..]);
        let bank = StreamBank::build(&cf.plan, &bytes);
        cf.evaluate(&bank, Mask8::ALL, cutoff)
    }

    #[test]
    fn empty_filter_passes_everything_with_zero_score() {
        let f = cf(r#"{}"#);
        let out = eval(&f, SEEDS, NO_CUTOFF);
        assert_eq!(out.pass, Mask8::ALL);
        assert_eq!(out.score, [0; LANES]);
        assert!(out.tallies.is_empty());
        assert_eq!(f.columns, vec!["seed", "score"]);
    }

    #[test]
    fn voucher_must_matches_scalar_reference() {
        let f = cf(
            r#"{ "deck": "Red", "stake": "White",
                 "must": [ { "type": "Voucher", "value": "Telescope", "antes": [1, 2] } ] }"#,
        );
        let out = eval(&f, SEEDS, NO_CUTOFF);
        for (k, raw) in SEEDS.iter().enumerate() {
            let seed = Seed::parse(raw).unwrap();
            let mut expected = false;
            for ante in [1u8, 2] {
                let s = Stream::new(&format!("Voucher{ante}"), seed.as_bytes()).unwrap();
                if f.pools.voucher.sample(s.draw_at(0)) == Voucher::Telescope {
                    expected = true;
                }
            }
            assert_eq!(out.pass.get(k), expected, "seed {raw}");
        }
    }

    #[test]
    fn should_scoring_counts_occurrences_times_score() {
        let f = cf(
            r#"{ "should": [ { "joker": "Blueprint", "antes": [1, 2, 3], "score": 100 } ] }"#,
        );
        let out = eval(&f, SEEDS, NO_CUTOFF);
        assert_eq!(out.pass, Mask8::ALL, "no must clauses: every lane passes");
        for (k, raw) in SEEDS.iter().enumerate() {
            let seed = Seed::parse(raw).unwrap();
            let mut occurrences = 0i64;
            for ante in [1u8, 2, 3] {
                let slots = if ante == 1 { 0..4u64 } else { 0..6u64 };
                for prefix in ["", "pak"] {
                    let rarity = Stream::new(&format!("{prefix}rarity{ante}"), seed.as_bytes())
                        .unwrap();
                    let rare =
                        Stream::new(&format!("{prefix}jokerR{ante}"), seed.as_bytes()).unwrap();
                    for slot in slots.clone() {
                        if f.pools.rarity.sample(rarity.draw_at(slot)) == Rarity::Rare
                            && f.pools.joker_rare.sample(rare.draw_at(slot)) == Joker::Blueprint
                        {
                            occurrences += 1;
                        }
                    }
                }
            }
            assert_eq!(out.score[k], 100 * occurrences, "seed {raw}");
            assert_eq!(out.tallies[0][k] as i64, occurrences, "seed {raw}");
        }
    }

    #[test]
    fn must_not_excludes_matching_lanes() {
        let base = cf(r#"{ "must": [ { "tag": "Any", "antes": [1] } ] }"#);
        let out = eval(&base, SEEDS, NO_CUTOFF);
        assert_eq!(out.pass, Mask8::ALL, "an Any tag clause matches every lane");

        let inverted = cf(r#"{ "mustNot": [ { "tag": "Any", "antes": [1] } ] }"#);
        let out = eval(&inverted, SEEDS, NO_CUTOFF);
        assert_eq!(out.pass, Mask8::NONE, "mustNot of Any excludes every lane");
    }

    #[test]
    fn erratic_fusion_equals_intersection_of_separate_clauses() {
        let rank_only = cf(
            r#"{ "deck": "Erratic",
                 "must": [ { "type": "ErraticRank", "rank": "Ace", "min": 3 } ] }"#,
        );
        let suit_only = cf(
            r#"{ "deck": "Erratic",
                 "must": [ { "type": "ErraticSuit", "suit": "Hearts", "min": 14 } ] }"#,
        );
        let fused = cf(
            r#"{ "deck": "Erratic",
                 "must": [ { "type": "ErraticRank", "rank": "Ace", "min": 3 },
                           { "type": "ErraticSuit", "suit": "Hearts", "min": 14 } ] }"#,
        );
        let a = eval(&rank_only, SEEDS, NO_CUTOFF);
        let b = eval(&suit_only, SEEDS, NO_CUTOFF);
        let both = eval(&fused, SEEDS, NO_CUTOFF);
        assert_eq!(both.pass, a.pass.and(b.pass));
    }

    #[test]
    fn erratic_counts_are_zero_off_the_erratic_deck() {
        let f = cf(
            r#"{ "deck": "Red",
                 "must": [ { "type": "ErraticRank", "rank": "Ace", "min": 1 } ] }"#,
        );
        let out = eval(&f, SEEDS, NO_CUTOFF);
        assert_eq!(out.pass, Mask8::NONE);
    }

    #[test]
    fn erratic_tallies_sum_to_52_over_all_ranks() {
        let f = cf(
            r#"{ "deck": "Erratic",
                 "should": [ { "type": "ErraticRank", "value": "Any" } ] }"#,
        );
        let out = eval(&f, SEEDS, NO_CUTOFF);
        for k in 0..LANES {
            assert_eq!(out.tallies[0][k], 52, "lane {k}");
        }
    }

    #[test]
    fn or_is_union_and_is_intersection() {
        let a = cf(r#"{ "must": [ { "voucher": "Telescope", "antes": [1,2,3,4] } ] }"#);
        let b = cf(r#"{ "must": [ { "voucher": "Grabber", "antes": [1,2,3,4] } ] }"#);
        let or = cf(
            r#"{ "must": [ { "type": "Or", "clauses": [
                    { "voucher": "Telescope", "antes": [1,2,3,4] },
                    { "voucher": "Grabber", "antes": [1,2,3,4] } ] } ] }"#,
        );
        let and = cf(
            r#"{ "must": [ { "type": "And", "clauses": [
                    { "voucher": "Telescope", "antes": [1,2,3,4] },
                    { "voucher": "Grabber", "antes": [1,2,3,4] } ] } ] }"#,
        );
        let pa = eval(&a, SEEDS, NO_CUTOFF).pass;
        let pb = eval(&b, SEEDS, NO_CUTOFF).pass;
        assert_eq!(eval(&or, SEEDS, NO_CUTOFF).pass, pa.or(pb));
        assert_eq!(eval(&and, SEEDS, NO_CUTOFF).pass, pa.and(pb));
    }

    #[test]
    fn cutoff_never_alters_surviving_lanes() {
        let f = cf(
            r#"{ "should": [
                    { "joker": "Any", "antes": [1, 2], "score": 3 },
                    { "tag": "Any", "antes": [1, 2], "score": 2 } ] }"#,
        );
        let free = eval(&f, SEEDS, NO_CUTOFF);
        let max = free.score.iter().copied().max().unwrap();
        for cutoff in [0, 1, max / 2, max, max + 1] {
            let cut = eval(&f, SEEDS, cutoff);
            for k in 0..LANES {
                if free.score[k] >= cutoff {
                    // Lanes that clear the cutoff are untouched by pruning.
                    assert_eq!(cut.score[k], free.score[k], "cutoff {cutoff} lane {k}");
                    for (t_cut, t_free) in cut.tallies.iter().zip(free.tallies.iter()) {
                        assert_eq!(t_cut[k], t_free[k], "cutoff {cutoff} lane {k}");
                    }
                } else {
                    // Pruned lanes must stay below the cutoff.
                    assert!(cut.score[k] < cutoff, "cutoff {cutoff} lane {k}");
                }
            }
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let f = cf(
            r#"{ "must": [ { "tag": "Double Tag" } ],
                 "should": [ { "spectral": "The Soul", "score": 50 } ] }"#,
        );
        let a = eval(&f, SEEDS, NO_CUTOFF);
        let b = eval(&f, SEEDS, NO_CUTOFF);
        assert_eq!(a.pass, b.pass);
        assert_eq!(a.score, b.score);
        assert_eq!(a.tallies, b.tallies);
    }

    #[test]
    fn soul_edition_only_matches_any_legendary_with_edition() {
        let f = cf(
            r#"{ "must": [ { "type": "SoulJoker", "edition": "Foil", "antes": [1, 2, 3, 4] } ] }"#,
        );
        let out = eval(&f, SEEDS, NO_CUTOFF);
        for (k, raw) in SEEDS.iter().enumerate() {
            let seed = Seed::parse(raw).unwrap();
            let mut expected = false;
            for ante in 1u8..=4 {
                let ed = Stream::new(&format!("soulEd{ante}"), seed.as_bytes()).unwrap();
                let slots = if ante == 1 { 0..4u64 } else { 0..6u64 };
                for slot in slots {
                    if f.pools.shop_edition.sample(ed.draw_at(slot)) == Edition::Foil {
                        expected = true;
                    }
                }
            }
            assert_eq!(out.pass.get(k), expected, "seed {raw}");
        }
    }

    #[test]
    fn inactive_lanes_are_never_reported() {
        let f = cf(r#"{}"#);
        let parsed: Vec<Seed> = SEEDS.iter().map(|s| Seed::parse(s).unwrap()).collect();
        let bytes: [&[u8]; LANES] = std::array::from_fn(|k| &parsed[k].as_bytes()[..]);
        let bank = StreamBank::build(&f.plan, &bytes);
        let active = Mask8(0b0000_0111);
        let out = f.evaluate(&bank, active, NO_CUTOFF);
        assert_eq!(out.pass, active);
    }

    #[test]
    fn columns_name_should_clauses() {
        let f = cf(
            r#"{ "should": [ { "joker": "Blueprint" }, { "tarot": "Death" } ] }"#,
        );
        assert_eq!(
            f.columns,
            vec!["seed", "score", "joker_blueprint", "tarotcard_death"]
        );
        assert_eq!(f.should_count(), 2);
    }

    #[test]
    fn max_score_bounds_every_outcome() {
        let f = cf(
            r#"{ "should": [
                    { "voucher": "Any", "antes": [1, 2], "score": 10 },
                    { "tag": "Any", "antes": [1], "score": 1 } ] }"#,
        );
        // Vouchers: one per ante, two antes. Tags: two per ante, one ante.
        assert_eq!(f.max_score(), 2 * 10 + 2);
        let out = eval(&f, SEEDS, NO_CUTOFF);
        for k in 0..LANES {
            assert!(out.score[k] <= f.max_score());
        }
        // An Any clause over both vouchers saturates exactly.
        assert!(out.score.iter().all(|&s| s >= 2), "Any matches every draw");
    }
}
