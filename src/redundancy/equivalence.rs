// Equivalence-set construction

use crate::cooccurrence::{CoOccurrenceMap, Runnable};
use fnv::FnvHashMap;
use std::collections::BTreeSet;

/// Groups of runnables considered interchangeable
///
/// Groups may overlap: a test redundant with two tests that are not
/// redundant with each other belongs to two groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EquivalenceSets {
    groups: Vec<BTreeSet<Runnable>>,
}

impl EquivalenceSets {
    /// Build groups over `candidates` at confidence threshold `min_confidence`
    ///
    /// Pairs are visited in sorted order. A runnable joins a group only if
    /// the group is not marked incompatible with it and none of the group's
    /// current members is known to be non-redundant with it.
    ///
    /// Incompatibility marks apply to the groups a runnable belonged to when
    /// the non-redundant pair was seen. They are not revisited when groups
    /// grow later, so the result is an approximation of a clique cover.
    pub fn build(
        candidates: &BTreeSet<Runnable>,
        map: &CoOccurrenceMap,
        min_confidence: f64,
        assume_redundant: bool,
    ) -> Self {
        let tasks: Vec<&Runnable> = candidates.iter().collect();
        let redundant = |a: usize, b: usize| {
            map.redundancy_confidence(tasks[a], tasks[b], assume_redundant) >= min_confidence
        };

        let mut builder = Builder::default();
        for first in 0..tasks.len() {
            builder.create_group(first);

            for second in first + 1..tasks.len() {
                if redundant(first, second) {
                    builder.add_to_groups(first, second, &redundant);
                } else {
                    builder.mark_incompatible(first, second);
                }
            }
        }

        let groups = builder
            .groups
            .into_iter()
            .map(|members| members.into_iter().map(|i| tasks[i].clone()).collect())
            .collect();

        Self { groups }
    }

    pub fn groups(&self) -> &[BTreeSet<Runnable>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether no runnable belongs to more than one group
    pub fn is_disjoint(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.groups
            .iter()
            .all(|group| group.iter().all(|runnable| seen.insert(runnable)))
    }
}

/// Index-based working state
#[derive(Default)]
struct Builder {
    groups: Vec<BTreeSet<usize>>,
    task_to_groups: FnvHashMap<usize, BTreeSet<usize>>,
    incompatible_groups: FnvHashMap<usize, BTreeSet<usize>>,
}

impl Builder {
    fn create_group(&mut self, task: usize) {
        if self.task_to_groups.contains_key(&task) {
            return;
        }

        self.groups.push(BTreeSet::from([task]));
        self.task_to_groups
            .insert(task, BTreeSet::from([self.groups.len() - 1]));
    }

    fn is_compatible(
        &self,
        group: usize,
        task: usize,
        redundant: &impl Fn(usize, usize) -> bool,
    ) -> bool {
        let marked = self
            .incompatible_groups
            .get(&task)
            .is_some_and(|groups| groups.contains(&group));

        !marked
            && self.groups[group]
                .iter()
                .all(|member| *member == task || redundant(*member, task))
    }

    /// Put each task in the compatible groups of the other
    fn add_to_groups(
        &mut self,
        first: usize,
        second: usize,
        redundant: &impl Fn(usize, usize) -> bool,
    ) {
        let mut found = false;

        for (from, to) in [(first, second), (second, first)] {
            let candidates: Vec<usize> = self
                .task_to_groups
                .get(&from)
                .map(|groups| groups.iter().copied().collect())
                .unwrap_or_default();

            for group in candidates {
                if !self.is_compatible(group, to, redundant) {
                    continue;
                }

                self.groups[group].insert(to);
                self.task_to_groups.entry(to).or_default().insert(group);
                found = true;
            }
        }

        if found {
            return;
        }

        self.groups.push(BTreeSet::from([first, second]));
        let index = self.groups.len() - 1;
        self.task_to_groups.entry(first).or_default().insert(index);
        self.task_to_groups.entry(second).or_default().insert(index);
    }

    fn mark_incompatible(&mut self, first: usize, second: usize) {
        for (member, other) in [(first, second), (second, first)] {
            if let Some(groups) = self.task_to_groups.get(&member) {
                self.incompatible_groups
                    .entry(other)
                    .or_default()
                    .extend(groups.iter().copied());
            }
        }
    }
}
