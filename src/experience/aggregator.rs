// Chronological experience pass over a batch of commits

use crate::commit::{CommitRecord, CommitType, Dimension, SECONDS_PER_DAY};
use crate::config::ExperienceConfig;
use crate::error::{FeatureError, Result};
use crate::experience::store::{CommitList, ExperienceCounter, ExperienceKey, ExperienceStore};
use fnv::{FnvHashMap, FnvHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sum, maximum and minimum of a statistic over the entities a commit touches
///
/// All three are 0 when the commit touches no entity in the dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceSummary {
    pub sum: u64,
    pub max: u64,
    pub min: u64,
}

impl ExperienceSummary {
    fn of(values: &[u64], sum: u64) -> Self {
        Self {
            sum,
            max: values.iter().copied().max().unwrap_or(0),
            min: values.iter().copied().min().unwrap_or(0),
        }
    }
}

/// Experience of one dimension and commit type, before the commit itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceStat {
    pub dimension: Dimension,
    pub commit_type: CommitType,
    /// Over the whole history
    pub total: ExperienceSummary,
    /// Over the experience window only
    pub windowed: ExperienceSummary,
}

/// Experience features of one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitExperience {
    pub node: String,
    /// Days since the first commit of the batch
    pub day: i64,
    /// Seconds since the author's first commit in the batch
    pub seniority_author: i64,
    pub window_days: i64,
    pub stats: Vec<ExperienceStat>,
}

impl CommitExperience {
    pub fn stat(&self, dimension: Dimension, commit_type: CommitType) -> Option<&ExperienceStat> {
        self.stats
            .iter()
            .find(|s| s.dimension == dimension && s.commit_type == commit_type)
    }

    /// Flat feature map for classifier input
    ///
    /// Names follow `touched_prev_{total|N_days}_{dimension}_[backout_]{sum|max|min}`;
    /// author experience has a single value per commit and only reports `sum`.
    pub fn to_feature_map(&self) -> BTreeMap<String, f64> {
        let mut features = BTreeMap::new();
        features.insert("seniority_author".to_string(), self.seniority_author as f64);

        let window = format!("{}_days", self.window_days);
        for stat in &self.stats {
            for (span, summary) in [("total", &stat.total), (window.as_str(), &stat.windowed)] {
                let mut prefix = format!("touched_prev_{}_{}_", span, stat.dimension);
                if stat.commit_type == CommitType::Backout {
                    prefix.push_str("backout_");
                }

                features.insert(format!("{}sum", prefix), summary.sum as f64);
                if stat.dimension != Dimension::Author {
                    features.insert(format!("{}max", prefix), summary.max as f64);
                    features.insert(format!("{}min", prefix), summary.min as f64);
                }
            }
        }

        features
    }
}

/// Single-writer experience pass
///
/// Feed commits in push order through [`process`](Self::process). Each call
/// reads the experience accumulated so far, then (for eligible commits)
/// records the commit itself.
#[derive(Debug, Clone)]
pub struct ExperienceAggregator {
    config: ExperienceConfig,
    store: ExperienceStore,
    first_pushdate: Option<i64>,
    author_first_seen: FnvHashMap<String, i64>,
    next_ordinal: u32,
}

impl ExperienceAggregator {
    pub fn new(config: ExperienceConfig) -> Self {
        let store = ExperienceStore::new(config.counter_length());
        Self {
            config,
            store,
            first_pushdate: None,
            author_first_seen: FnvHashMap::default(),
            next_ordinal: 0,
        }
    }

    pub fn store(&self) -> &ExperienceStore {
        &self.store
    }

    /// Compute the features of `commit` and account for it
    ///
    /// The first commit processed defines day 0.
    ///
    /// # Errors
    ///
    /// [`FeatureError::CommitBeforeBatchStart`] if the commit predates the
    /// first one, [`FeatureError::Ordering`] if it lands on an earlier day
    /// than a previous update of the same counter.
    pub fn process(&mut self, commit: &CommitRecord) -> Result<CommitExperience> {
        let first = *self.first_pushdate.get_or_insert(commit.pushdate);
        let elapsed = commit.pushdate - first;
        if elapsed < 0 {
            return Err(FeatureError::CommitBeforeBatchStart {
                node: commit.node.clone(),
                seconds: -elapsed,
            });
        }
        let day = elapsed.div_euclid(SECONDS_PER_DAY);

        let seniority_author = match self.author_first_seen.get(&commit.author) {
            Some(seen) => commit.pushdate - seen,
            None => {
                self.author_first_seen
                    .insert(commit.author.clone(), commit.pushdate);
                0
            }
        };

        for (orig, copied) in &commit.file_copies {
            for commit_type in self.store.copy_history(Dimension::File, orig, copied) {
                tracing::warn!(
                    "Experience missing for file {}, type {:?}, on commit {}",
                    orig,
                    commit_type,
                    commit.node
                );
            }
        }

        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        let mut stats = Vec::with_capacity(Dimension::ALL.len() * CommitType::ALL.len());
        for dimension in Dimension::ALL {
            let entities = commit.entities(dimension);
            for commit_type in CommitType::ALL {
                let record = commit.is_eligible() && commit.commit_type() == commit_type;
                let stat = if dimension.is_complex() {
                    let ordinal = record.then_some(ordinal);
                    self.complex_experience(commit, dimension, commit_type, &entities, day, ordinal)?
                } else {
                    self.simple_experience(commit, dimension, commit_type, &entities, day, record)?
                };
                stats.push(stat);
            }
        }

        Ok(CommitExperience {
            node: commit.node.clone(),
            day,
            seniority_author,
            window_days: self.config.window_days,
            stats,
        })
    }

    fn simple_experience(
        &mut self,
        commit: &CommitRecord,
        dimension: Dimension,
        commit_type: CommitType,
        entities: &[String],
        day: i64,
        record: bool,
    ) -> Result<ExperienceStat> {
        let window = self.config.window_days;
        let mut totals = Vec::with_capacity(entities.len());
        let mut windowed = Vec::with_capacity(entities.len());

        for entity in entities {
            let key = ExperienceKey::new(dimension, commit_type, entity.as_str());
            let (total, before) = match self.store.get(&key).and_then(ExperienceCounter::as_count) {
                Some(counter) => (counter.get(day), counter.get(day - window)),
                None => (0, 0),
            };
            totals.push(total);
            windowed.push(total - before);
        }

        if record {
            for (entity, total) in entities.iter().zip(&totals) {
                let key = ExperienceKey::new(dimension, commit_type, entity.as_str());
                if let ExperienceCounter::Count(counter) = self.store.get_or_create(&key, day) {
                    counter
                        .set(day, total + 1)
                        .map_err(|source| ordering_error(commit, dimension, source))?;
                }
            }
        }

        Ok(ExperienceStat {
            dimension,
            commit_type,
            total: ExperienceSummary::of(&totals, totals.iter().sum()),
            windowed: ExperienceSummary::of(&windowed, windowed.iter().sum()),
        })
    }

    fn complex_experience(
        &mut self,
        commit: &CommitRecord,
        dimension: Dimension,
        commit_type: CommitType,
        entities: &[String],
        day: i64,
        record: Option<u32>,
    ) -> Result<ExperienceStat> {
        let window = self.config.window_days;
        let mut all_lists: Vec<CommitList> = Vec::with_capacity(entities.len());
        let mut all_commits = FnvHashSet::default();
        let mut recent_commits = FnvHashSet::default();
        let mut total_lengths = Vec::with_capacity(entities.len());
        let mut recent_lengths = Vec::with_capacity(entities.len());

        for entity in entities {
            let key = ExperienceKey::new(dimension, commit_type, entity.as_str());
            let (all, before) = match self.store.get(&key).and_then(ExperienceCounter::as_commits) {
                Some(counter) => (counter.get(day), counter.get(day - window)),
                None => (Vec::new(), Vec::new()),
            };

            // Lists only grow, so the older snapshot is a prefix.
            let recent = all.get(before.len()..).unwrap_or(&[]);
            recent_commits.extend(recent.iter().copied());
            recent_lengths.push(recent.len() as u64);

            all_commits.extend(all.iter().copied());
            total_lengths.push(all.len() as u64);
            all_lists.push(all);
        }

        if let Some(ordinal) = record {
            for (entity, mut list) in entities.iter().zip(all_lists) {
                list.push(ordinal);
                let key = ExperienceKey::new(dimension, commit_type, entity.as_str());
                if let ExperienceCounter::Commits(counter) = self.store.get_or_create(&key, day) {
                    counter
                        .set(day, list)
                        .map_err(|source| ordering_error(commit, dimension, source))?;
                }
            }
        }

        Ok(ExperienceStat {
            dimension,
            commit_type,
            total: ExperienceSummary::of(&total_lengths, all_commits.len() as u64),
            windowed: ExperienceSummary::of(&recent_lengths, recent_commits.len() as u64),
        })
    }
}

fn ordering_error(
    commit: &CommitRecord,
    dimension: Dimension,
    source: crate::temporal_counter::OrderingViolation,
) -> FeatureError {
    FeatureError::Ordering {
        context: format!("commit {}, {} experience", commit.node, dimension),
        source,
    }
}

/// Experience features for a batch of commits in push order
///
/// # Example
/// ```
/// use testwise::commit::CommitRecord;
/// use testwise::experience::compute_experience_features;
///
/// let commits = vec![
///     CommitRecord { node: "a".into(), author: "ana".into(), pushdate: 0, bug_id: Some(1), ..Default::default() },
///     CommitRecord { node: "b".into(), author: "ana".into(), pushdate: 86_400, bug_id: Some(2), ..Default::default() },
/// ];
///
/// let features = compute_experience_features(&commits).unwrap();
/// assert_eq!(features[1].to_feature_map()["touched_prev_total_author_sum"], 1.0);
/// ```
pub fn compute_experience_features(commits: &[CommitRecord]) -> Result<Vec<CommitExperience>> {
    compute_experience_features_with(commits, &ExperienceConfig::default())
}

/// Same as [`compute_experience_features`] with an explicit configuration
pub fn compute_experience_features_with(
    commits: &[CommitRecord],
    config: &ExperienceConfig,
) -> Result<Vec<CommitExperience>> {
    tracing::info!("Analyzing experiences from {} commits...", commits.len());

    let mut aggregator = ExperienceAggregator::new(config.clone());
    let features = commits
        .iter()
        .map(|commit| aggregator.process(commit))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        "Experience pass finished with {} live counters",
        aggregator.store().len()
    );
    Ok(features)
}
