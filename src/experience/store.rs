// Counter storage for experience features

use crate::commit::{CommitType, Dimension};
use crate::temporal_counter::TemporalCounter;
use fnv::FnvHashMap;

/// Ordinals of the commits that touched an item, oldest first
pub type CommitList = Vec<u32>;

/// Identifies one experience counter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExperienceKey {
    pub dimension: Dimension,
    pub commit_type: CommitType,
    pub entity: String,
}

impl ExperienceKey {
    pub fn new(dimension: Dimension, commit_type: CommitType, entity: impl Into<String>) -> Self {
        Self {
            dimension,
            commit_type,
            entity: entity.into(),
        }
    }
}

/// Counter value type, chosen by dimension
///
/// Authors and reviewers count events. Files and directories keep the list
/// of contributing commits so several items touched by the same commit can
/// be unioned without over-counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperienceCounter {
    Count(TemporalCounter<u64>),
    Commits(TemporalCounter<CommitList>),
}

impl ExperienceCounter {
    fn for_dimension(dimension: Dimension, day: i64, length: usize) -> Self {
        if dimension.is_complex() {
            ExperienceCounter::Commits(TemporalCounter::ending_at(day, length, Vec::new()))
        } else {
            ExperienceCounter::Count(TemporalCounter::ending_at(day, length, 0))
        }
    }

    pub fn as_count(&self) -> Option<&TemporalCounter<u64>> {
        match self {
            ExperienceCounter::Count(counter) => Some(counter),
            ExperienceCounter::Commits(_) => None,
        }
    }

    pub fn as_commits(&self) -> Option<&TemporalCounter<CommitList>> {
        match self {
            ExperienceCounter::Commits(counter) => Some(counter),
            ExperienceCounter::Count(_) => None,
        }
    }
}

/// All experience counters of one pass
///
/// Counters are created on first write; reading an entity that was never
/// written yields zero experience without allocating.
#[derive(Debug, Clone)]
pub struct ExperienceStore {
    counters: FnvHashMap<ExperienceKey, ExperienceCounter>,
    length: usize,
}

impl ExperienceStore {
    /// Create a store whose counters keep `length` day buckets
    pub fn new(length: usize) -> Self {
        Self {
            counters: FnvHashMap::default(),
            length,
        }
    }

    pub fn get(&self, key: &ExperienceKey) -> Option<&ExperienceCounter> {
        self.counters.get(key)
    }

    /// Counter for `key`, created ending at `day` if absent
    pub fn get_or_create(&mut self, key: &ExperienceKey, day: i64) -> &mut ExperienceCounter {
        let length = self.length;
        self.counters
            .entry(key.clone())
            .or_insert_with(|| ExperienceCounter::for_dimension(key.dimension, day, length))
    }

    /// Give `copied` an independent copy of the history of `orig`
    ///
    /// Applies to both commit types. Returns the commit types for which
    /// `orig` had no history; for those, `copied` starts empty.
    pub fn copy_history(
        &mut self,
        dimension: Dimension,
        orig: &str,
        copied: &str,
    ) -> Vec<CommitType> {
        let mut missing = Vec::new();

        for commit_type in CommitType::ALL {
            let source = ExperienceKey::new(dimension, commit_type, orig);
            let target = ExperienceKey::new(dimension, commit_type, copied);

            match self.counters.get(&source).cloned() {
                Some(counter) => {
                    self.counters.insert(target, counter);
                }
                None => {
                    self.counters.remove(&target);
                    missing.push(commit_type);
                }
            }
        }

        missing
    }

    /// Number of live counters
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
