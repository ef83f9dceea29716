// Published co-occurrence statistics

use crate::cooccurrence::runnable::{Granularity, Runnable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Co-failure statistics of one unordered pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairStats {
    /// Fraction of joint runs in which both failed
    pub support: f64,
    /// Fraction of runs with a failure in which both failed
    pub confidence: f64,
}

/// Histogram buckets reported after mining, highest first
pub const CONFIDENCE_BUCKETS: [(&str, f64); 10] = [
    (">=90%", 0.9),
    (">=80%", 0.8),
    (">=70%", 0.7),
    (">=60%", 0.6),
    (">=50%", 0.5),
    (">=40%", 0.4),
    (">=30%", 0.3),
    (">=20%", 0.2),
    (">=10%", 0.1),
    (">0%", 0.0),
];

/// Immutable pairwise statistics, keyed smaller runnable first
///
/// Built once by the miner and then shared read-only by any number of
/// optimizer calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrenceMap {
    granularity: Granularity,
    pairs: BTreeMap<Runnable, BTreeMap<Runnable, PairStats>>,
    all_runnables: BTreeSet<Runnable>,
    configs_by_group: BTreeMap<String, BTreeSet<String>>,
}

impl CoOccurrenceMap {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            pairs: BTreeMap::new(),
            all_runnables: BTreeSet::new(),
            configs_by_group: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(
        granularity: Granularity,
        pairs: BTreeMap<Runnable, BTreeMap<Runnable, PairStats>>,
        all_runnables: BTreeSet<Runnable>,
        configs_by_group: BTreeMap<String, BTreeSet<String>>,
    ) -> Self {
        Self {
            granularity,
            pairs,
            all_runnables,
            configs_by_group,
        }
    }

    /// Record `stats` for the pair, in either order
    pub fn insert(&mut self, a: Runnable, b: Runnable, stats: PairStats) {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.all_runnables.insert(first.clone());
        self.all_runnables.insert(second.clone());
        self.pairs.entry(first).or_default().insert(second, stats);
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn get(&self, a: &Runnable, b: &Runnable) -> Option<&PairStats> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.pairs.get(first)?.get(second)
    }

    pub fn confidence(&self, a: &Runnable, b: &Runnable) -> Option<f64> {
        self.get(a, b).map(|stats| stats.confidence)
    }

    /// Confidence used for redundancy decisions
    ///
    /// Unobserved pairs default to 1.0 when `assume_redundant` is set and to
    /// 0.0 otherwise. At config-group granularity, runnables of different
    /// groups are never redundant.
    pub fn redundancy_confidence(&self, a: &Runnable, b: &Runnable, assume_redundant: bool) -> f64 {
        if self.granularity == Granularity::ConfigGroup && a.group() != b.group() {
            return 0.0;
        }

        match self.confidence(a, b) {
            Some(confidence) => confidence,
            None if assume_redundant => 1.0,
            None => 0.0,
        }
    }

    /// Statistics recorded for pairs whose smaller member is `runnable`
    pub fn partners(&self, runnable: &Runnable) -> Option<&BTreeMap<Runnable, PairStats>> {
        self.pairs.get(runnable)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Runnable, &Runnable, &PairStats)> {
        self.pairs
            .iter()
            .flat_map(|(a, partners)| partners.iter().map(move |(b, stats)| (a, b, stats)))
    }

    /// Number of recorded pairs
    pub fn len(&self) -> usize {
        self.pairs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Every runnable seen while mining
    pub fn all_runnables(&self) -> &BTreeSet<Runnable> {
        &self.all_runnables
    }

    /// Configurations seen per group (config-group granularity only)
    pub fn configs_by_group(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.configs_by_group
    }

    /// Pair counts per confidence bucket, cumulative like the labels suggest
    ///
    /// Starts with `==100%` and ends with `0%`; a pair at confidence 1.0 is
    /// counted in every bucket but the last.
    pub fn confidence_histogram(&self) -> Vec<(&'static str, usize)> {
        let confidences: Vec<f64> = self.iter().map(|(_, _, stats)| stats.confidence).collect();

        let mut histogram = Vec::with_capacity(CONFIDENCE_BUCKETS.len() + 2);
        histogram.push((
            "==100%",
            confidences.iter().filter(|c| **c >= 1.0).count(),
        ));
        for (label, threshold) in CONFIDENCE_BUCKETS {
            let count = if threshold == 0.0 {
                confidences.iter().filter(|c| **c > 0.0).count()
            } else {
                confidences.iter().filter(|c| **c >= threshold).count()
            };
            histogram.push((label, count));
        }
        histogram.push(("0%", confidences.iter().filter(|c| **c == 0.0).count()));

        histogram
    }
}
