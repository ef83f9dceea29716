//! End-to-end test selection: mine co-occurrence, persist it, and schedule
//! a batch of pushes with redundancy reduction and platform costs.

use std::collections::BTreeSet;
use tempfile::TempDir;
use testwise::checkpoint::{load_cooccurrence_map, save_cooccurrence_map};
use testwise::config::Config;
use testwise::cooccurrence::{
    mine_cooccurrence, mine_cooccurrence_with, Granularity, PushOutcome, Runnable,
};
use testwise::redundancy::SolveStatus;
use testwise::selection::{select_batch, Scores, SelectionPolicy};

const CONFIG: &str = r#"
[selection]
confidence_threshold = 0.5
reduce = true
minimum = 2

[[costs.rules]]
substrings = ["windows"]
cost = 6
"#;

fn dom_linux() -> Runnable {
    Runnable::in_config("dom", "linux")
}

fn dom_windows() -> Runnable {
    Runnable::in_config("dom", "windows")
}

fn js_linux() -> Runnable {
    Runnable::in_config("js", "linux")
}

fn history() -> Vec<PushOutcome> {
    (0..10)
        .map(|i| {
            let failures = match i {
                2 | 7 => vec![dom_linux(), dom_windows()],
                4 => vec![js_linux()],
                _ => Vec::new(),
            };
            PushOutcome {
                revisions: vec![format!("r{}", i)],
                runnables: vec![dom_linux(), dom_windows(), js_linux()],
                failures,
            }
        })
        .collect()
}

fn scores(entries: &[(Runnable, f64)]) -> Scores {
    entries.iter().cloned().collect()
}

#[test]
fn test_batch_selection_with_persisted_map() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cooccurrence.msgpack");

    let mined = mine_cooccurrence(&history(), Granularity::ConfigGroup);
    let stats = mined.get(&dom_windows(), &dom_linux()).unwrap();
    assert_eq!(stats.support, 0.2);
    assert_eq!(stats.confidence, 1.0);
    // Different groups are never compared
    assert!(mined.get(&dom_linux(), &js_linux()).is_none());

    save_cooccurrence_map(&mined, &path).unwrap();
    let map = load_cooccurrence_map(&path).unwrap();

    let config = Config::from_toml_str(CONFIG).unwrap();
    let policy = SelectionPolicy::from_config(&config);
    let requests = vec![
        scores(&[(dom_linux(), 0.9), (dom_windows(), 0.8), (js_linux(), 0.7)]),
        scores(&[(dom_linux(), 0.1), (dom_windows(), 0.9), (js_linux(), 0.1)]),
    ];

    let selections = select_batch(&policy, &requests, &map, &config.costs);
    assert_eq!(selections.len(), 2);

    // The windows run costs more, so the linux one represents the group
    let expected: BTreeSet<Runnable> = [dom_linux(), js_linux()].into_iter().collect();
    assert_eq!(selections[0].selected, expected);
    assert_eq!(selections[0].reduction, Some(SolveStatus::Optimal));

    // Only dom@windows passes the threshold; the minimum tops up by score,
    // ties broken by name
    let expected: BTreeSet<Runnable> = [dom_linux(), dom_windows()].into_iter().collect();
    assert_eq!(selections[1].selected, expected);
}

fn as_label(runnable: &Runnable) -> Runnable {
    Runnable::label(runnable.to_string())
}

#[test]
fn test_mining_stops_at_revision() {
    let config = Config::default();
    let outcomes: Vec<PushOutcome> = history()
        .into_iter()
        .map(|push| PushOutcome {
            revisions: push.revisions,
            runnables: push.runnables.iter().map(as_label).collect(),
            failures: push.failures.iter().map(as_label).collect(),
        })
        .collect();

    let a = Runnable::label("dom@linux");
    let b = Runnable::label("dom@windows");

    let full = mine_cooccurrence_with(&outcomes, Granularity::Label, &config.cooccurrence, None);
    assert_eq!(full.get(&a, &b).unwrap().support, 0.2);

    // Pushes r0..=r4 only: one joint failure in five runs
    let early =
        mine_cooccurrence_with(&outcomes, Granularity::Label, &config.cooccurrence, Some("r4"));
    assert_eq!(early.get(&a, &b).unwrap().support, 0.2);
    assert_eq!(early.all_runnables().len(), 3);

    // Pushes r0..=r1: no joint failure yet, the pair is dropped
    let earliest =
        mine_cooccurrence_with(&outcomes, Granularity::Label, &config.cooccurrence, Some("r1"));
    assert!(earliest.get(&a, &b).is_none());
    assert!(earliest.is_empty());
}
