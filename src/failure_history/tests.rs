// Past-failure scenarios

use super::*;
use crate::commit::PushRecord;
use crate::config::FailureHistoryConfig;

fn push(files: &[&str], failures: &[&str]) -> PushRecord {
    PushRecord {
        revisions: vec!["rev".to_string()],
        files: files.iter().map(|f| f.to_string()).collect(),
        failures: failures.iter().map(|f| f.to_string()).collect(),
    }
}

fn quiet_pushes(count: usize) -> Vec<PushRecord> {
    (0..count).map(|_| push(&["misc/noop.txt"], &[])).collect()
}

fn tests(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn scope(features: &FailureFeatures, scope: FailureScope) -> &ScopeFailures {
    features.scope(scope).unwrap()
}

#[test]
fn test_prior_failure_is_counted_on_later_push() {
    let pushes = vec![push(&["a/x.rs"], &["t1"]), push(&["b/y.rs"], &[])];

    let features = compute_failure_history_features(&pushes, &tests(&["t1", "t2"])).unwrap();
    assert_eq!(features.len(), 4);

    // The failing push itself only sees earlier history.
    assert!(features[0].is_failure);
    assert_eq!(scope(&features[0], FailureScope::All).total, 0);

    assert_eq!(features[2].test, "t1");
    assert_eq!(scope(&features[2], FailureScope::All).total, 1);
    assert_eq!(features[3].test, "t2");
    assert_eq!(scope(&features[3], FailureScope::All).total, 0);
}

#[test]
fn test_counters_created_only_on_regression() {
    let mut history = FailureHistory::default();
    history
        .compute_features(&quiet_pushes(5), &tests(&["t1", "t2"]))
        .unwrap();

    assert!(history.is_empty());
    assert_eq!(history.push_num(), 5);

    history
        .process_push(&push(&["a/x.rs"], &["t1"]), &tests(&["t1", "t2"]))
        .unwrap();
    // all, type, file and the single directory "a"
    assert_eq!(history.len(), 4);

    let key = FailureKey::new(FailureScope::All, "t1", ALL_ITEM);
    assert_eq!(history.counter(&key).unwrap().len(), 46);
}

#[test]
fn test_same_bucket_failures_accumulate() {
    let pushes = vec![
        push(&["a/x.rs"], &["t1"]),
        push(&["a/x.rs"], &["t1"]),
        push(&["a/x.rs"], &[]),
    ];

    let features = compute_failure_history_features(&pushes, &tests(&["t1"])).unwrap();
    assert_eq!(scope(&features[1], FailureScope::All).total, 1);
    assert_eq!(scope(&features[2], FailureScope::All).total, 2);
    assert_eq!(scope(&features[2], FailureScope::File).total, 2);
}

#[test]
fn test_scopes_match_on_shared_items() {
    let pushes = vec![
        push(&["dom/base/a.cpp"], &["t1"]),
        push(&["dom/base/b.cpp"], &[]),
        push(&["js/src/c.py"], &[]),
    ];

    let features = compute_failure_history_features(&pushes, &tests(&["t1"])).unwrap();

    let same_dir = &features[1];
    assert_eq!(scope(same_dir, FailureScope::All).total, 1);
    assert_eq!(scope(same_dir, FailureScope::Type).total, 1);
    assert_eq!(scope(same_dir, FailureScope::File).total, 0);
    // Matches both "dom" and "dom/base".
    assert_eq!(scope(same_dir, FailureScope::Directory).total, 2);

    let unrelated = &features[2];
    assert_eq!(scope(unrelated, FailureScope::All).total, 1);
    assert_eq!(scope(unrelated, FailureScope::Type).total, 0);
    assert_eq!(scope(unrelated, FailureScope::File).total, 0);
    assert_eq!(scope(unrelated, FailureScope::Directory).total, 0);
}

#[test]
fn test_values_are_summed_across_items() {
    let pushes = vec![
        push(&["a/x.rs"], &["t1"]),
        push(&["b/y.rs"], &["t1"]),
        push(&["a/x.rs", "b/y.rs"], &[]),
    ];

    let features = compute_failure_history_features(&pushes, &tests(&["t1"])).unwrap();
    let last = &features[2];

    assert_eq!(scope(last, FailureScope::All).total, 2);
    assert_eq!(scope(last, FailureScope::File).total, 2);
    assert_eq!(scope(last, FailureScope::Directory).total, 2);
    // Both files are Rust, and the type counter saw both failures.
    assert_eq!(scope(last, FailureScope::Type).total, 2);
}

#[test]
fn test_lookback_deltas() {
    let mut pushes = vec![push(&["a/x.rs"], &["t1"])];
    pushes.extend(quiet_pushes(649));
    pushes.push(push(&["a/x.rs"], &["t1"])); // push 650, bucket 6
    pushes.extend(quiet_pushes(49));
    pushes.push(push(&["a/x.rs"], &[])); // push 700, bucket 7

    let features = compute_failure_history_features(&pushes, &tests(&["t1"])).unwrap();
    let probe = features.last().unwrap();
    assert_eq!(probe.push_num, 700);

    let all = scope(probe, FailureScope::All);
    assert_eq!(all.total, 2);
    // Bucket 0 holds 1, so the last 700 pushes add one failure.
    assert_eq!(all.past, vec![1, 2, 2]);
}

#[test]
fn test_old_failures_leave_the_short_lookback() {
    let mut pushes = vec![push(&["a/x.rs"], &["t1"])];
    pushes.extend(quiet_pushes(799));
    pushes.push(push(&["a/x.rs"], &[])); // push 800, bucket 8

    let features = compute_failure_history_features(&pushes, &tests(&["t1"])).unwrap();
    let probe = features.last().unwrap();

    let all = scope(probe, FailureScope::All);
    assert_eq!(all.total, 1);
    assert_eq!(all.past, vec![0, 1, 1]);
    assert_eq!(scope(probe, FailureScope::File).past, vec![0, 1, 1]);
}

#[test]
fn test_features_for_is_read_only() {
    let mut history = FailureHistory::default();
    history
        .compute_features(&[push(&["a/x.rs"], &["t1"])], &tests(&["t1"]))
        .unwrap();
    let before = history.clone();

    let hypothetical = push(&["a/x.rs"], &["t1"]);
    let features = history.features_for(history.push_num(), &hypothetical, "t1");

    assert_eq!(scope(&features, FailureScope::File).total, 1);
    assert!(features.is_failure);
    assert_eq!(history, before);
}

#[test]
fn test_all_runnables_registry() {
    let mut history = FailureHistory::default();
    history
        .process_push(&push(&["a/x.rs"], &["t3"]), &tests(&["t1", "t2"]))
        .unwrap();

    let runnables: Vec<&str> = history.all_runnables().iter().map(String::as_str).collect();
    assert_eq!(runnables, vec!["t1", "t2", "t3"]);
}

#[test]
fn test_feature_map_names() {
    let pushes = vec![push(&["a/x.rs"], &["t1"]), push(&["a/x.rs"], &[])];
    let features = compute_failure_history_features(&pushes, &tests(&["t1"])).unwrap();
    let map = features[1].to_feature_map();

    assert_eq!(map.len(), 16);
    assert_eq!(map["failures"], 1.0);
    assert_eq!(map["failures_past_700_pushes"], 1.0);
    assert_eq!(map["failures_past_2800_pushes_in_types"], 1.0);
    assert_eq!(map["failures_in_files"], 1.0);
    assert_eq!(map["failures_past_1400_pushes_in_directories"], 1.0);
}

#[test]
fn test_resumed_history_matches_single_pass() {
    let pushes = vec![
        push(&["a/x.rs"], &["t1"]),
        push(&["b/y.py"], &["t2"]),
        push(&["a/x.rs", "b/y.py"], &["t1", "t2"]),
        push(&["a/z.rs"], &[]),
    ];
    let candidates = tests(&["t1", "t2"]);

    let single = compute_failure_history_features(&pushes, &candidates).unwrap();

    let mut history = FailureHistory::default();
    let mut resumed = history.compute_features(&pushes[..2], &candidates).unwrap();
    let mut restored = history.clone();
    resumed.extend(restored.compute_features(&pushes[2..], &candidates).unwrap());

    assert_eq!(single, resumed);
}

#[test]
fn test_custom_bucket_width() {
    let config = FailureHistoryConfig {
        bucket_width: 10,
        timespan: 100,
        lookbacks: vec![20],
    };
    let mut history = FailureHistory::new(config);

    let mut pushes = vec![push(&["a/x.rs"], &["t1"])];
    pushes.extend(quiet_pushes(29));
    pushes.push(push(&["a/x.rs"], &[])); // push 30, bucket 3

    let features = history.compute_features(&pushes, &tests(&["t1"])).unwrap();
    let probe = features.last().unwrap();

    assert_eq!(scope(probe, FailureScope::All).past, vec![0]);
    assert!(probe.to_feature_map().contains_key("failures_past_20_pushes"));
    let key = FailureKey::new(FailureScope::All, "t1", ALL_ITEM);
    assert_eq!(history.counter(&key).unwrap().len(), 11);
}
