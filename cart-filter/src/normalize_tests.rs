#[cfg(test)]
mod tests {
    use crate::doc::{ClauseKind, DocFormat, FilterDoc};
    use crate::error::FilterError;
    use crate::normalize::normalize;

    fn doc_from(json: &str) -> FilterDoc {
        FilterDoc::from_str(json, DocFormat::Json).expect("test document parses")
    }

    #[test]
    fn normalize_is_idempotent() {
        let doc = doc_from(
            r#"{
                "name": "t",
                "deck": "Red",
                "stake": "White",
                "defaults": { "antes": [1, 2], "score": 5 },
                "must": [
                    { "joker": "blueprint", "edition": "negative" },
                    { "type": "Voucher", "values": ["telescope", "Observatory"] },
                    { "type": "And", "clauses": [ { "tag": "Double Tag" }, { "boss": "The Hook" } ] }
                ],
                "should": [
                    { "tarot": "the fool" },
                    { "type": "Event", "value": "WheelFoil", "rolls": [3, 1] }
                ],
                "mustNot": [ { "spectral": "Ankh" } ]
            }"#,
        );
        let once = normalize(&doc).unwrap();
        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn shorthand_expands_to_type_and_values() {
        let doc = doc_from(r#"{ "must": [ { "joker": "Blueprint", "antes": [2, 1, 2] } ] }"#);
        let n = normalize(&doc).unwrap();
        let c = &n.must[0];
        assert_eq!(c.kind, Some(ClauseKind::Joker));
        assert_eq!(c.values.as_deref(), Some(&["Blueprint".to_string()][..]));
        assert!(c.joker.is_none());
        assert_eq!(c.antes.as_deref(), Some(&[1i64, 2][..]));

        // The longhand spelling normalizes to the same clause.
        let long = doc_from(
            r#"{ "must": [ { "type": "Joker", "value": "Blueprint", "antes": [1, 2] } ] }"#,
        );
        assert_eq!(normalize(&long).unwrap().must[0], n.must[0]);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let doc = doc_from(
            r#"{
                "defaults": { "antes": [3, 4], "packSlots": [0, 1], "score": 7 },
                "should": [ { "tarot": "Death" } ]
            }"#,
        );
        let n = normalize(&doc).unwrap();
        let c = &n.should[0];
        assert_eq!(c.antes.as_deref(), Some(&[3i64, 4][..]));
        assert_eq!(c.pack_slots.as_deref(), Some(&[0i64, 1][..]));
        assert_eq!(c.score, Some(7));
        assert_eq!(c.min, Some(1));
    }

    #[test]
    fn hardcoded_defaults_without_document_defaults() {
        let doc = doc_from(r#"{ "should": [ { "voucher": "Telescope" } ] }"#);
        let n = normalize(&doc).unwrap();
        let c = &n.should[0];
        assert_eq!(c.antes.as_deref(), Some(&[1i64, 2, 3, 4, 5, 6, 7, 8][..]));
        assert_eq!(c.score, Some(1));
    }

    #[test]
    fn values_list_merges_and_dedups() {
        let doc = doc_from(
            r#"{ "must": [ { "type": "Tag", "value": "Double Tag", "values": ["double tag", "D6 Tag"] } ] }"#,
        );
        let n = normalize(&doc).unwrap();
        assert_eq!(
            n.must[0].values.as_deref(),
            Some(&["Double Tag".to_string(), "D6 Tag".to_string()][..])
        );
    }

    #[test]
    fn any_swallows_other_values() {
        let doc = doc_from(
            r#"{ "must": [ { "type": "Joker", "values": ["Blueprint", "Any"] } ] }"#,
        );
        let n = normalize(&doc).unwrap();
        assert_eq!(n.must[0].values.as_deref(), Some(&["Any".to_string()][..]));
    }

    #[test]
    fn soul_joker_defaults_to_any() {
        let doc = doc_from(r#"{ "must": [ { "type": "SoulJoker", "edition": "Negative" } ] }"#);
        let n = normalize(&doc).unwrap();
        assert_eq!(n.must[0].values.as_deref(), Some(&["Any".to_string()][..]));
        assert_eq!(n.must[0].require_mega, Some(false));
    }

    #[test]
    fn erratic_rank_shorthand() {
        let doc = doc_from(r#"{ "must": [ { "type": "ErraticRank", "rank": "Ace", "min": 8 } ] }"#);
        let n = normalize(&doc).unwrap();
        assert_eq!(n.must[0].values.as_deref(), Some(&["Ace".to_string()][..]));
        assert_eq!(n.must[0].min, Some(8));
        assert!(n.must[0].antes.is_none());
    }

    #[test]
    fn playing_card_rank_and_suit_combine() {
        let doc = doc_from(
            r#"{ "must": [ { "type": "PlayingCard", "rank": "King", "suit": "Hearts" } ] }"#,
        );
        let n = normalize(&doc).unwrap();
        assert_eq!(
            n.must[0].values.as_deref(),
            Some(&["King of Hearts".to_string()][..])
        );
    }

    #[test]
    fn unknown_type_is_rejected_at_parse() {
        let err = FilterDoc::from_str(
            r#"{ "must": [ { "type": "Jokers?" } ] }"#,
            DocFormat::Json,
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::Parse(_)), "{err}");
    }

    #[test]
    fn unknown_value_reports_path() {
        let doc = doc_from(r#"{ "must": [ { "joker": "Blueprnt" } ] }"#);
        let err = normalize(&doc).unwrap_err();
        match err {
            FilterError::UnknownValue { path, got, .. } => {
                assert_eq!(path, "must[0].values");
                assert_eq!(got, "Blueprnt");
            }
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn out_of_range_ante_reports_path() {
        let doc = doc_from(r#"{ "should": [ { "voucher": "Telescope", "antes": [1, 9] } ] }"#);
        let err = normalize(&doc).unwrap_err();
        match err {
            FilterError::AnteOutOfRange { path, got } => {
                assert_eq!(path, "should[0].antes[1]");
                assert_eq!(got, 9);
            }
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn score_outside_should_is_rejected() {
        let doc = doc_from(r#"{ "must": [ { "joker": "Egg", "score": 10 } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::ScoreOutsidePhase { .. }
        ));
        // Nested clauses cannot score either, even inside should.
        let doc = doc_from(
            r#"{ "should": [ { "type": "Or", "clauses": [ { "joker": "Egg", "score": 3 } ] } ] }"#,
        );
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::ScoreOutsidePhase { .. }
        ));
    }

    #[test]
    fn negative_min_is_rejected() {
        let doc = doc_from(r#"{ "must": [ { "joker": "Egg", "min": -1 } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::BadMin { got: -1, .. }
        ));
    }

    #[test]
    fn empty_compound_is_rejected() {
        let doc = doc_from(r#"{ "must": [ { "type": "And", "clauses": [] } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::EmptyCompound { .. }
        ));
    }

    #[test]
    fn clause_without_category_is_rejected() {
        let doc = doc_from(r#"{ "must": [ { "antes": [1] } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::AmbiguousCategory { .. }
        ));
    }

    #[test]
    fn clause_with_two_categories_is_rejected() {
        let doc = doc_from(r#"{ "must": [ { "joker": "Egg", "voucher": "Telescope" } ] }"#);
        let err = normalize(&doc).unwrap_err();
        match err {
            FilterError::AmbiguousCategory { found, .. } => {
                assert!(found.contains("joker") && found.contains("voucher"), "{found}");
            }
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn inapplicable_fields_are_rejected() {
        let doc = doc_from(r#"{ "must": [ { "tag": "Double Tag", "shopSlots": [0] } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::FieldNotApplicable { field: "shopSlots", .. }
        ));
        let doc = doc_from(r#"{ "must": [ { "boss": "The Hook", "edition": "Foil" } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::FieldNotApplicable { field: "edition", .. }
        ));
    }

    #[test]
    fn nested_erratic_is_rejected() {
        let doc = doc_from(
            r#"{ "must": [ { "type": "And", "clauses": [ { "type": "ErraticRank", "rank": "Ace" } ] } ] }"#,
        );
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::NestedErratic { .. }
        ));
    }

    #[test]
    fn non_legendary_soul_value_is_rejected() {
        let doc = doc_from(r#"{ "must": [ { "soulJoker": "Blueprint" } ] }"#);
        assert!(matches!(
            normalize(&doc).unwrap_err(),
            FilterError::UnknownValue { .. }
        ));
        let doc = doc_from(r#"{ "must": [ { "soulJoker": "Perkeo" } ] }"#);
        assert!(normalize(&doc).is_ok());
    }

    #[test]
    fn yaml_documents_load() {
        let doc = FilterDoc::from_str(
            "must:\n  - joker: Blueprint\n    antes: [1, 2]\n",
            DocFormat::Yaml,
        )
        .unwrap();
        let n = normalize(&doc).unwrap();
        assert_eq!(n.must[0].kind, Some(ClauseKind::Joker));
    }

    #[test]
    fn clause_kind_names_fold() {
        assert_eq!(ClauseKind::from_name("tarot"), Some(ClauseKind::TarotCard));
        assert_eq!(ClauseKind::from_name("TAROTCARD"), Some(ClauseKind::TarotCard));
        assert_eq!(ClauseKind::from_name("souljoker"), Some(ClauseKind::SoulJoker));
        assert_eq!(ClauseKind::from_name("erratic"), None);
    }

    #[test]
    fn empty_document_normalizes_to_itself() {
        let doc = doc_from(r#"{}"#);
        let n = normalize(&doc).unwrap();
        assert!(n.must.is_empty() && n.should.is_empty() && n.must_not.is_empty());
    }
}
