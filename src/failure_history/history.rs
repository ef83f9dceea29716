// Failure-history state and per-push feature computation

use crate::commit::PushRecord;
use crate::config::FailureHistoryConfig;
use crate::error::{FeatureError, Result};
use crate::temporal_counter::TemporalCounter;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Item of the `All` scope
pub const ALL_ITEM: &str = "all";

/// What a push is compared on when looking up past failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// Any push
    All,
    /// Pushes touching the same file types
    Type,
    /// Pushes touching the same files
    File,
    /// Pushes touching the same directories
    Directory,
}

impl FailureScope {
    pub const ALL: [FailureScope; 4] = [
        FailureScope::All,
        FailureScope::Type,
        FailureScope::File,
        FailureScope::Directory,
    ];

    /// Distinct items of `push` in this scope
    pub fn items(self, push: &PushRecord) -> Vec<String> {
        match self {
            FailureScope::All => vec![ALL_ITEM.to_string()],
            FailureScope::Type => push.types(),
            FailureScope::File => push.distinct_files(),
            FailureScope::Directory => push.directories(),
        }
    }

    fn feature_suffix(self) -> &'static str {
        match self {
            FailureScope::All => "",
            FailureScope::Type => "_in_types",
            FailureScope::File => "_in_files",
            FailureScope::Directory => "_in_directories",
        }
    }
}

/// Identifies one past-failure counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureKey {
    pub scope: FailureScope,
    pub test: String,
    pub item: String,
}

impl FailureKey {
    pub fn new(scope: FailureScope, test: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            scope,
            test: test.into(),
            item: item.into(),
        }
    }
}

/// Past failures of a test in one scope, summed over the push's items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFailures {
    pub scope: FailureScope,
    pub total: u64,
    /// One delta per configured lookback, in the same order
    pub past: Vec<u64>,
}

/// Past-failure features of one test on one push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureFeatures {
    pub push_num: u64,
    pub test: String,
    /// Whether the test regressed on this push (the training label)
    pub is_failure: bool,
    /// Lookbacks in pushes, matching `ScopeFailures::past`
    pub lookbacks: Vec<u64>,
    pub scopes: Vec<ScopeFailures>,
}

impl FailureFeatures {
    pub fn scope(&self, scope: FailureScope) -> Option<&ScopeFailures> {
        self.scopes.iter().find(|s| s.scope == scope)
    }

    /// Flat feature map, e.g. `failures_past_1400_pushes_in_files`
    pub fn to_feature_map(&self) -> BTreeMap<String, f64> {
        let mut features = BTreeMap::new();

        for scope in &self.scopes {
            let suffix = scope.scope.feature_suffix();
            features.insert(format!("failures{}", suffix), scope.total as f64);
            for (lookback, value) in self.lookbacks.iter().zip(&scope.past) {
                features.insert(
                    format!("failures_past_{}_pushes{}", lookback, suffix),
                    *value as f64,
                );
            }
        }

        features
    }
}

/// Checkpointable past-failure state
///
/// Holds every live counter, the running push counter and the registry of
/// runnables seen so far. Pushes must be fed in order; the push counter is
/// the chronological key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureHistory {
    config: FailureHistoryConfig,
    counters: FnvHashMap<FailureKey, TemporalCounter<u64>>,
    push_num: u64,
    all_runnables: BTreeSet<String>,
}

impl Default for FailureHistory {
    fn default() -> Self {
        Self::new(FailureHistoryConfig::default())
    }
}

impl FailureHistory {
    pub fn new(config: FailureHistoryConfig) -> Self {
        Self {
            config,
            counters: FnvHashMap::default(),
            push_num: 0,
            all_runnables: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &FailureHistoryConfig {
        &self.config
    }

    /// Number of the next push to be processed
    pub fn push_num(&self) -> u64 {
        self.push_num
    }

    /// Every runnable seen as a candidate or a failure
    pub fn all_runnables(&self) -> &BTreeSet<String> {
        &self.all_runnables
    }

    pub fn counter(&self, key: &FailureKey) -> Option<&TemporalCounter<u64>> {
        self.counters.get(key)
    }

    /// Number of live counters
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Features for every push in order, updating the history as it goes
    pub fn compute_features(
        &mut self,
        pushes: &[PushRecord],
        candidates: &[String],
    ) -> Result<Vec<FailureFeatures>> {
        tracing::info!(
            "Computing past failures for {} pushes and {} candidate tests (starting at push {})",
            pushes.len(),
            candidates.len(),
            self.push_num
        );

        let mut features = Vec::with_capacity(pushes.len() * candidates.len());
        for push in pushes {
            features.extend(self.process_push(push, candidates)?);
        }

        tracing::info!(
            "Past-failure pass finished with {} live counters",
            self.counters.len()
        );
        Ok(features)
    }

    /// Features of every candidate on `push`, then record its regressions
    ///
    /// All reads for the push happen before any write, so the features only
    /// reflect strictly earlier pushes.
    pub fn process_push(
        &mut self,
        push: &PushRecord,
        candidates: &[String],
    ) -> Result<Vec<FailureFeatures>> {
        let push_num = self.push_num;
        let bucket = self.config.bucket(push_num);
        let items: Vec<(FailureScope, Vec<String>)> = FailureScope::ALL
            .iter()
            .map(|scope| (*scope, scope.items(push)))
            .collect();

        let mut features = Vec::with_capacity(candidates.len());
        let mut updates = Vec::new();

        for test in candidates {
            let is_failure = push.is_failure(test);
            let mut scopes = Vec::with_capacity(items.len());

            for (scope, scope_items) in &items {
                let (summary, values) = self.read_scope(*scope, test, scope_items, bucket);
                scopes.push(summary);

                if is_failure {
                    for (item, value) in scope_items.iter().zip(values) {
                        updates.push((FailureKey::new(*scope, test.as_str(), item.as_str()), value));
                    }
                }
            }

            features.push(FailureFeatures {
                push_num,
                test: test.clone(),
                is_failure,
                lookbacks: self.config.lookbacks.clone(),
                scopes,
            });
        }

        let length = self.config.counter_length();
        for (key, value) in updates {
            let context = format!("push {}, test {}", push_num, key.test);
            self.counters
                .entry(key)
                .or_insert_with(|| TemporalCounter::ending_at(bucket, length, 0))
                .set(bucket, value + 1)
                .map_err(|source| FeatureError::Ordering { context, source })?;
        }

        self.all_runnables.extend(candidates.iter().cloned());
        self.all_runnables.extend(push.failures.iter().cloned());
        self.push_num += 1;

        Ok(features)
    }

    /// Features of `test` for a hypothetical push, without recording anything
    ///
    /// Used at selection time for a change that has not been pushed yet.
    pub fn features_for(&self, push_num: u64, push: &PushRecord, test: &str) -> FailureFeatures {
        let bucket = self.config.bucket(push_num);
        let scopes = FailureScope::ALL
            .iter()
            .map(|scope| self.read_scope(*scope, test, &scope.items(push), bucket).0)
            .collect();

        FailureFeatures {
            push_num,
            test: test.to_string(),
            is_failure: push.is_failure(test),
            lookbacks: self.config.lookbacks.clone(),
            scopes,
        }
    }

    /// Sum the scope's items; also returns the current value per item
    fn read_scope(
        &self,
        scope: FailureScope,
        test: &str,
        items: &[String],
        bucket: i64,
    ) -> (ScopeFailures, Vec<u64>) {
        let lookbacks = self.config.lookback_buckets();
        let mut total = 0;
        let mut past = vec![0; lookbacks.len()];
        let mut values = Vec::with_capacity(items.len());

        for item in items {
            let key = FailureKey::new(scope, test, item.as_str());
            let Some(counter) = self.counters.get(&key) else {
                values.push(0);
                continue;
            };

            let value = counter.get(bucket);
            total += value;
            for (slot, lookback) in past.iter_mut().zip(&lookbacks) {
                *slot += value - counter.get(bucket - lookback);
            }
            values.push(value);
        }

        (ScopeFailures { scope, total, past }, values)
    }
}

/// Past-failure features for a fresh history
///
/// # Example
/// ```
/// use testwise::commit::PushRecord;
/// use testwise::failure_history::compute_failure_history_features;
///
/// let pushes = vec![
///     PushRecord { files: vec!["a/x.rs".into()], failures: vec!["t1".into()], ..Default::default() },
///     PushRecord { files: vec!["a/y.rs".into()], ..Default::default() },
/// ];
/// let features = compute_failure_history_features(&pushes, &["t1".to_string()]).unwrap();
///
/// assert_eq!(features[1].to_feature_map()["failures"], 1.0);
/// assert_eq!(features[1].to_feature_map()["failures_in_files"], 0.0);
/// assert_eq!(features[1].to_feature_map()["failures_in_directories"], 1.0);
/// ```
pub fn compute_failure_history_features(
    pushes: &[PushRecord],
    candidates: &[String],
) -> Result<Vec<FailureFeatures>> {
    FailureHistory::default().compute_features(pushes, candidates)
}
