//! Comprehensive property-based tests for pre-commit hook
//!
//! Covers the core invariants of testwise with proptest. Designed to run
//! under 30 seconds as a pre-commit quality gate.
//!
//! Core features tested:
//! 1. TemporalCounter window semantics
//! 2. Past-failure feature accumulation
//! 3. Co-occurrence statistics
//! 4. Redundancy reduction coverage

use proptest::prelude::*;
use std::collections::BTreeSet;
use testwise::commit::PushRecord;
use testwise::cooccurrence::{
    mine_cooccurrence, CoOccurrenceMap, Granularity, PairStats, PushOutcome, Runnable,
};
use testwise::config::OptimizerConfig;
use testwise::failure_history::{compute_failure_history_features, FailureScope};
use testwise::redundancy::{EquivalenceSets, RedundancyOptimizer, UniformCost};
use testwise::temporal_counter::TemporalCounter;

const LABELS: [&str; 6] = ["t0", "t1", "t2", "t3", "t4", "t5"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_counter_extrapolates_flat(
        length in 1usize..12,
        writes in prop::collection::vec((0i64..6, 0u64..1000), 1..30),
    ) {
        // Property: every in-window bucket holds the latest write at or before it
        let mut counter = TemporalCounter::ending_at(0, length, 0u64);
        let mut history: Vec<(i64, u64)> = Vec::new();
        let mut bucket = 0;

        for (i, (gap, value)) in writes.iter().enumerate() {
            if i > 0 {
                bucket += gap;
            }
            counter.set(bucket, *value).unwrap();
            history.push((bucket, *value));
        }

        prop_assert_eq!(counter.len(), length);
        prop_assert_eq!(counter.last(), bucket);

        for q in counter.anchor()..=counter.last() {
            let expected = history
                .iter()
                .rev()
                .find(|(b, _)| *b <= q)
                .map(|(_, v)| *v)
                .unwrap_or(0);
            prop_assert_eq!(counter.get(q), expected, "bucket {}", q);
        }

        // Past the window: the newest value
        prop_assert_eq!(counter.get(bucket + 100), history[history.len() - 1].1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_untouched_counter_reports_default(
        anchor in -50i64..50,
        length in 1usize..20,
        default in 0u64..100,
        query in -200i64..200,
    ) {
        let counter = TemporalCounter::new(anchor, length, default);
        prop_assert_eq!(counter.get(query), default);
    }

    #[test]
    fn prop_rewriting_newest_bucket_is_idempotent(
        length in 1usize..8,
        jumps in prop::collection::vec(0i64..4, 0..10),
        value in 0u64..50,
    ) {
        let mut counter = TemporalCounter::ending_at(0, length, 0u64);
        let mut bucket = 0;
        for jump in jumps {
            bucket += jump;
            counter.set(bucket, bucket as u64).unwrap();
        }

        counter.set(bucket, value).unwrap();
        let once = counter.clone();
        counter.set(bucket, value).unwrap();

        prop_assert_eq!(counter, once);
    }

    #[test]
    fn prop_writing_backwards_is_rejected(
        length in 1usize..8,
        last in 1i64..100,
        back in 1i64..10,
    ) {
        let mut counter = TemporalCounter::ending_at(0, length, 0u64);
        counter.set(last, 1).unwrap();

        let before = counter.clone();
        prop_assert!(counter.set(last - back, 2).is_err());
        prop_assert_eq!(counter, before);
    }
}

fn push_strategy() -> impl Strategy<Value = PushRecord> {
    (
        prop::collection::vec(prop::sample::select(vec!["a/x.rs", "a/y.js", "b/z.rs"]), 1..3),
        prop::collection::vec(prop::sample::select(LABELS[..3].to_vec()), 0..3),
    )
        .prop_map(|(files, failures)| PushRecord {
            revisions: vec!["r".to_string()],
            files: files.into_iter().map(String::from).collect(),
            failures: failures.into_iter().map(String::from).collect(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_past_failures_accumulate(
        pushes in prop::collection::vec(push_strategy(), 1..40),
    ) {
        // Property: the overall failure count never decreases, and windowed
        // counts never exceed the total
        let candidates: Vec<String> = LABELS[..3].iter().map(|s| s.to_string()).collect();
        let features = compute_failure_history_features(&pushes, &candidates).unwrap();
        prop_assert_eq!(features.len(), pushes.len() * candidates.len());

        for test in &candidates {
            let mut previous = 0;
            let mut regressions = 0;
            for feature in features.iter().filter(|f| &f.test == test) {
                let all = feature.scope(FailureScope::All).unwrap();
                prop_assert!(all.total >= previous);
                prop_assert_eq!(all.total, regressions);
                for past in &all.past {
                    prop_assert!(*past <= all.total);
                }

                previous = all.total;
                if feature.is_failure {
                    regressions += 1;
                }
            }
        }
    }
}

fn outcome_strategy() -> impl Strategy<Value = PushOutcome> {
    (
        prop::collection::btree_set(prop::sample::select(LABELS.to_vec()), 0..6),
        prop::collection::btree_set(prop::sample::select(LABELS.to_vec()), 0..3),
    )
        .prop_map(|(runnables, failures)| PushOutcome {
            revisions: vec!["r".to_string()],
            runnables: runnables.into_iter().map(Runnable::label).collect(),
            failures: failures.into_iter().map(Runnable::label).collect(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_cooccurrence_stats_are_bounded_and_symmetric(
        pushes in prop::collection::vec(outcome_strategy(), 1..30),
    ) {
        let map = mine_cooccurrence(&pushes, Granularity::Label);

        for (a, b, stats) in map.iter() {
            prop_assert!(a < b);
            prop_assert!(stats.support > 0.0 && stats.support <= 1.0);
            prop_assert!((0.0..=1.0).contains(&stats.confidence));
            prop_assert_eq!(map.confidence(a, b), map.confidence(b, a));
        }
    }
}

fn map_strategy() -> impl Strategy<Value = CoOccurrenceMap> {
    prop::collection::vec(
        (
            prop::sample::select(LABELS.to_vec()),
            prop::sample::select(LABELS.to_vec()),
            prop::bool::ANY,
        ),
        0..12,
    )
    .prop_map(|pairs| {
        let mut map = CoOccurrenceMap::new(Granularity::Label);
        for (a, b, redundant) in pairs {
            if a != b {
                map.insert(
                    Runnable::label(a),
                    Runnable::label(b),
                    PairStats {
                        support: 0.1,
                        confidence: if redundant { 1.0 } else { 0.0 },
                    },
                );
            }
        }
        map
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reduction_never_under_selects(
        map in map_strategy(),
        names in prop::collection::btree_set(prop::sample::select(LABELS.to_vec()), 0..6),
        assume_redundant in prop::bool::ANY,
    ) {
        // Property: every equivalence set keeps at least one member
        let candidates: BTreeSet<Runnable> = names.into_iter().map(Runnable::label).collect();
        let config = OptimizerConfig {
            min_confidence: 0.9,
            assume_redundant,
            ..OptimizerConfig::default()
        };

        let sets = EquivalenceSets::build(&candidates, &map, 0.9, assume_redundant);
        let outcome = RedundancyOptimizer::new(&map, config).reduce(&candidates, &UniformCost);

        prop_assert!(outcome.selected.is_subset(&candidates));
        for group in sets.groups() {
            prop_assert!(group.iter().any(|r| outcome.selected.contains(r)));
        }
        if outcome.is_fallback() {
            prop_assert_eq!(&outcome.selected, &candidates);
        }
        // Every candidate belongs to some set
        let covered: BTreeSet<&Runnable> = sets.groups().iter().flatten().collect();
        prop_assert_eq!(covered.len(), candidates.len());
    }
}
