#[cfg(test)]
mod tests {
    use crate::{sanitize_filter_id, Reconciled, ResultRow, Store, RESULT_CAP};
    use cart_core::Seed;

    fn row(seed: &str, score: i64, tally: Vec<u16>) -> ResultRow {
        ResultRow {
            seed: Seed::parse(seed).unwrap(),
            score,
            tally,
        }
    }

    #[test]
    fn sanitize_replaces_foreign_characters() {
        assert_eq!(
            sanitize_filter_id("neg tribo!", "Red", "White"),
            "neg-tribo-_Red_White"
        );
        assert_eq!(sanitize_filter_id("plain", "Erratic", "Gold"), "plain_Erratic_Gold");
    }

    #[test]
    fn fresh_store_reconciles_to_fresh() {
        let store = Store::in_memory(1).unwrap();
        let r = store.reconcile("{}", 2).unwrap();
        assert_eq!(r, Reconciled::Fresh { salvaged: 0 });
        assert_eq!(store.last_completed_batch().unwrap(), -1);
    }

    #[test]
    fn unchanged_filter_resumes_from_checkpoint() {
        let store = Store::in_memory(1).unwrap();
        store.reconcile("{\"must\":[]}", 2).unwrap();
        store.checkpoint(41).unwrap();
        let r = store.reconcile("{\"must\":[]}", 2).unwrap();
        assert_eq!(
            r,
            Reconciled::Resumed {
                last_completed_batch: 41
            }
        );
    }

    #[test]
    fn changed_filter_resets_and_salvages() {
        let store = Store::in_memory(1).unwrap();
        store.reconcile("old", 2).unwrap();
        store.checkpoint(10).unwrap();
        store
            .upsert_results(&[row("AAAAAAAA", 5, vec![1]), row("BBBBBBBB", 7, vec![2])])
            .unwrap();

        let r = store.reconcile("new", 2).unwrap();
        assert_eq!(r, Reconciled::Fresh { salvaged: 2 });
        assert_eq!(store.last_completed_batch().unwrap(), -1);
        assert_eq!(store.result_count().unwrap(), 0);
        // Salvaged seeds landed in the pile.
        let pile = store.pile_seeds().unwrap();
        assert_eq!(pile.len(), 2);
    }

    #[test]
    fn changed_batch_size_also_resets() {
        let store = Store::in_memory(0).unwrap();
        store.reconcile("same", 2).unwrap();
        store.checkpoint(3).unwrap();
        let r = store.reconcile("same", 3).unwrap();
        assert!(matches!(r, Reconciled::Fresh { .. }));
    }

    #[test]
    fn upsert_keeps_higher_score_on_conflict() {
        let store = Store::in_memory(1).unwrap();
        store.reconcile("f", 2).unwrap();
        store.upsert_results(&[row("AAAAAAAA", 5, vec![1])]).unwrap();
        store.upsert_results(&[row("AAAAAAAA", 3, vec![9])]).unwrap();
        let top = store.top(10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].score, 5);
        assert_eq!(top[0].tally, vec![1]);

        store.upsert_results(&[row("AAAAAAAA", 8, vec![4])]).unwrap();
        let top = store.top(10).unwrap();
        assert_eq!(top[0].score, 8);
        assert_eq!(top[0].tally, vec![4]);
    }

    #[test]
    fn table_is_capped_at_result_cap() {
        let store = Store::in_memory(0).unwrap();
        store.reconcile("f", 2).unwrap();
        let rows: Vec<ResultRow> = (0..(RESULT_CAP + 50) as u64)
            .map(|i| ResultRow {
                seed: Seed::from_index(i * 31),
                score: i as i64,
                tally: vec![],
            })
            .collect();
        store.upsert_results(&rows).unwrap();
        assert_eq!(store.result_count().unwrap(), RESULT_CAP);
        // The lowest scores were the ones dropped.
        let top = store.top(RESULT_CAP).unwrap();
        assert!(top.iter().all(|r| r.score >= 50));
    }

    #[test]
    fn top_is_score_ordered_descending() {
        let store = Store::in_memory(0).unwrap();
        store.reconcile("f", 2).unwrap();
        store
            .upsert_results(&[
                row("AAAAAAAA", 3, vec![]),
                row("BBBBBBBB", 9, vec![]),
                row("CCCCCCCC", 6, vec![]),
            ])
            .unwrap();
        let top = store.top(10).unwrap();
        let scores: Vec<i64> = top.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![9, 6, 3]);
    }

    #[test]
    fn nth_best_score_drives_cutoff_adaptation() {
        let store = Store::in_memory(0).unwrap();
        store.reconcile("f", 2).unwrap();
        assert_eq!(store.nth_best_score(10).unwrap(), None);
        for i in 0..12u64 {
            store
                .upsert_results(&[ResultRow {
                    seed: Seed::from_index(i),
                    score: 100 - i as i64,
                    tally: vec![],
                }])
                .unwrap();
        }
        assert_eq!(store.nth_best_score(1).unwrap(), Some(100));
        assert_eq!(store.nth_best_score(10).unwrap(), Some(91));
    }

    #[test]
    fn checkpoint_is_monotonic() {
        let store = Store::in_memory(0).unwrap();
        store.reconcile("f", 2).unwrap();
        store.checkpoint(10).unwrap();
        store.checkpoint(7).unwrap();
        assert_eq!(store.last_completed_batch().unwrap(), 10);
        store.checkpoint(11).unwrap();
        assert_eq!(store.last_completed_batch().unwrap(), 11);
    }

    #[test]
    fn pile_dedups() {
        let store = Store::in_memory(0).unwrap();
        let a = Seed::parse("AAAAAAAA").unwrap();
        let b = Seed::parse("BBBBBBBB").unwrap();
        store.pile_insert(&[a, b]).unwrap();
        store.pile_insert(&[a]).unwrap();
        assert_eq!(store.pile_seeds().unwrap().len(), 2);
    }

    #[test]
    fn tally_arity_mismatch_is_rejected() {
        let store = Store::in_memory(2).unwrap();
        store.reconcile("f", 2).unwrap();
        let err = store
            .upsert_results(&[row("AAAAAAAA", 1, vec![1])])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::StoreError::TallyArity { got: 1, expected: 2 }
        ));
    }

    #[test]
    fn arity_change_rebuilds_table_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path(), "f_Red_White", 2).unwrap();
            store.reconcile("old", 2).unwrap();
            store
                .upsert_results(&[row("AAAAAAAA", 4, vec![1, 2])])
                .unwrap();
        }
        // New filter with a different should-clause count.
        let store = Store::open(dir.path(), "f_Red_White", 3).unwrap();
        let r = store.reconcile("new", 2).unwrap();
        assert_eq!(r, Reconciled::Fresh { salvaged: 1 });
        assert!(store.pile_seeds().unwrap().iter().any(|s| s.as_str() == "AAAAAAAA"));
        store
            .upsert_results(&[row("BBBBBBBB", 1, vec![0, 1, 2])])
            .unwrap();
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path(), "s_Red_White", 1).unwrap();
            store.reconcile("text", 4).unwrap();
            store.checkpoint(99).unwrap();
            store.upsert_results(&[row("CARTCART", 12, vec![3])]).unwrap();
        }
        let store = Store::open(dir.path(), "s_Red_White", 1).unwrap();
        assert_eq!(
            store.reconcile("text", 4).unwrap(),
            Reconciled::Resumed {
                last_completed_batch: 99
            }
        );
        let top = store.top(5).unwrap();
        assert_eq!(top[0].seed.as_str(), "CARTCART");
        assert_eq!(top[0].score, 12);
    }
}
