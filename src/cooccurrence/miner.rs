// Single pass over push outcomes counting joint runs and failures

use crate::config::CoOccurrenceConfig;
use crate::cooccurrence::map::{CoOccurrenceMap, PairStats};
use crate::cooccurrence::runnable::{Granularity, PushOutcome, Runnable};
use fnv::FnvHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Raw counts of one unordered pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairCounts {
    pub runs: u64,
    pub both_fail: u64,
    pub single_fail: u64,
}

impl PairCounts {
    /// Support and confidence, or `None` when the pair is too rare to keep
    pub fn finalize(&self, granularity: Granularity, min_support: f64) -> Option<PairStats> {
        if self.runs == 0 {
            return None;
        }

        let support = self.both_fail as f64 / self.runs as f64;
        if granularity == Granularity::Label && support < min_support {
            return None;
        }

        let confidence = if self.both_fail > 0 {
            self.both_fail as f64 / (self.single_fail + self.both_fail) as f64
        } else if self.single_fail == 0 && granularity == Granularity::ConfigGroup {
            // Configurations are assumed interchangeable until one fails alone.
            1.0
        } else {
            0.0
        };

        Some(PairStats {
            support,
            confidence,
        })
    }
}

/// Accumulates pair counts push by push
///
/// Work per push is quadratic in the number of runnables compared together,
/// which at config-group granularity is the size of a single group.
#[derive(Debug, Clone)]
pub struct CoOccurrenceMiner {
    granularity: Granularity,
    config: CoOccurrenceConfig,
    counts: FnvHashMap<(Runnable, Runnable), PairCounts>,
    all_runnables: BTreeSet<Runnable>,
    configs_by_group: BTreeMap<String, BTreeSet<String>>,
    pushes: usize,
}

impl CoOccurrenceMiner {
    pub fn new(granularity: Granularity, config: CoOccurrenceConfig) -> Self {
        Self {
            granularity,
            config,
            counts: FnvHashMap::default(),
            all_runnables: BTreeSet::new(),
            configs_by_group: BTreeMap::new(),
            pushes: 0,
        }
    }

    pub fn pushes(&self) -> usize {
        self.pushes
    }

    pub fn counts(&self, a: &Runnable, b: &Runnable) -> Option<&PairCounts> {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.counts.get(&key)
    }

    pub fn observe(&mut self, push: &PushOutcome) {
        let failures: BTreeSet<&Runnable> = push.failures.iter().collect();
        let available: BTreeSet<&Runnable> =
            push.runnables.iter().chain(&push.failures).collect();

        self.all_runnables.extend(available.iter().map(|r| (*r).clone()));

        match self.granularity {
            Granularity::Label => {
                let tasks: Vec<&Runnable> = available.into_iter().collect();
                self.count_pairs(&tasks, &failures);
            }
            Granularity::ConfigGroup => {
                let mut groups: BTreeMap<&str, Vec<&Runnable>> = BTreeMap::new();
                for runnable in available {
                    if let Some(config) = &runnable.config {
                        self.configs_by_group
                            .entry(runnable.group().to_string())
                            .or_default()
                            .insert(config.clone());
                    }
                    groups.entry(runnable.group()).or_default().push(runnable);
                }

                for tasks in groups.values() {
                    self.count_pairs(tasks, &failures);
                }
            }
        }

        self.pushes += 1;
    }

    /// `tasks` must be sorted and distinct
    fn count_pairs(&mut self, tasks: &[&Runnable], failures: &BTreeSet<&Runnable>) {
        for (i, first) in tasks.iter().enumerate() {
            let first_failed = failures.contains(first);
            for second in &tasks[i + 1..] {
                let second_failed = failures.contains(second);
                let counts = self
                    .counts
                    .entry(((*first).clone(), (*second).clone()))
                    .or_default();

                counts.runs += 1;
                match (first_failed, second_failed) {
                    (true, true) => counts.both_fail += 1,
                    (true, false) | (false, true) => counts.single_fail += 1,
                    (false, false) => {}
                }
            }
        }
    }

    /// Turn the counts into the published map
    pub fn finish(self) -> CoOccurrenceMap {
        let mut pairs: BTreeMap<Runnable, BTreeMap<Runnable, PairStats>> = BTreeMap::new();
        let mut skipped = 0;

        for ((first, second), counts) in &self.counts {
            match counts.finalize(self.granularity, self.config.min_support) {
                Some(stats) => {
                    pairs
                        .entry(first.clone())
                        .or_default()
                        .insert(second.clone(), stats);
                }
                None => skipped += 1,
            }
        }

        tracing::info!(
            "{} couples skipped because their support was too low",
            skipped
        );

        let map = CoOccurrenceMap::from_parts(
            self.granularity,
            pairs,
            self.all_runnables,
            self.configs_by_group,
        );
        log_summary(&map, &self.counts, self.config.summary_size);
        map
    }
}

fn log_summary(
    map: &CoOccurrenceMap,
    counts: &FnvHashMap<(Runnable, Runnable), PairCounts>,
    size: usize,
) {
    let mut ranked: Vec<_> = map.iter().collect();

    ranked.sort_by(|x, y| {
        y.2.confidence
            .total_cmp(&x.2.confidence)
            .then(y.2.support.total_cmp(&x.2.support))
    });
    tracing::info!("Redundancies with the highest support and confidence:");
    log_top(&ranked[..size.min(ranked.len())], counts);

    ranked.sort_by(|x, y| {
        y.2.confidence
            .total_cmp(&x.2.confidence)
            .then(x.2.support.total_cmp(&y.2.support))
    });
    tracing::info!("Redundancies with the highest confidence and lowest support:");
    log_top(&ranked[..size.min(ranked.len())], counts);

    for (label, count) in map.confidence_histogram() {
        tracing::info!("{} with {} confidence", count, label);
    }
}

fn log_top(
    ranked: &[(&Runnable, &Runnable, &PairStats)],
    counts: &FnvHashMap<(Runnable, Runnable), PairCounts>,
) {
    for (a, b, stats) in ranked {
        let pair = counts
            .get(&((*a).clone(), (*b).clone()))
            .copied()
            .unwrap_or_default();
        tracing::info!(
            "{} - {} redundancy confidence {:.3}, support {:.4} ({} over {})",
            a,
            b,
            stats.confidence,
            stats.support,
            pair.both_fail,
            pair.runs
        );
    }
}

/// Mine pairwise co-failure statistics with the default configuration
///
/// # Example
/// ```
/// use testwise::cooccurrence::{mine_cooccurrence, Granularity, PushOutcome, Runnable};
///
/// let (a, b) = (Runnable::label("a"), Runnable::label("b"));
/// let pushes = vec![
///     PushOutcome { runnables: vec![a.clone(), b.clone()], failures: vec![a.clone(), b.clone()], ..Default::default() },
///     PushOutcome { runnables: vec![a.clone(), b.clone()], ..Default::default() },
/// ];
///
/// let map = mine_cooccurrence(&pushes, Granularity::Label);
/// assert_eq!(map.get(&b, &a).unwrap().support, 0.5);
/// assert_eq!(map.get(&a, &b).unwrap().confidence, 1.0);
/// ```
pub fn mine_cooccurrence(pushes: &[PushOutcome], granularity: Granularity) -> CoOccurrenceMap {
    mine_cooccurrence_with(pushes, granularity, &CoOccurrenceConfig::default(), None)
}

/// Mine with an explicit configuration, optionally stopping after `up_to`
///
/// When `up_to` is given, the pass ends after the first push whose newest
/// revision equals it, so statistics can be restricted to a training range.
pub fn mine_cooccurrence_with(
    pushes: &[PushOutcome],
    granularity: Granularity,
    config: &CoOccurrenceConfig,
    up_to: Option<&str>,
) -> CoOccurrenceMap {
    tracing::info!(
        "Mining {} co-occurrence over {} pushes",
        granularity,
        pushes.len()
    );

    let mut miner = CoOccurrenceMiner::new(granularity, config.clone());
    for push in pushes {
        miner.observe(push);

        if up_to.is_some() && push.revisions.first().map(String::as_str) == up_to {
            tracing::info!("Stopping at revision {:?} after {} pushes", up_to, miner.pushes());
            break;
        }
    }

    miner.finish()
}
