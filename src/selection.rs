//! Turning classifier scores into a test schedule
//!
//! Each candidate runnable comes with a failure probability from the
//! classifier. The policy keeps the likely failures, optionally drops
//! redundant ones, then enforces a minimum and a cap on the schedule size.
//!
//! Many pushes can be scheduled at once with [`select_batch`]: worker
//! threads pull request indices from a lock-free queue and share the
//! co-occurrence map read-only.

use crate::config::{Config, OptimizerConfig, SelectionConfig};
use crate::cooccurrence::{CoOccurrenceMap, Runnable};
use crate::redundancy::{CostModel, RedundancyOptimizer, SolveStatus};
use crossbeam::queue::ArrayQueue;
use std::collections::{BTreeMap, BTreeSet};

/// Classifier score per candidate runnable
pub type Scores = BTreeMap<Runnable, f64>;

/// Outcome of applying the policy to one push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub selected: BTreeSet<Runnable>,
    /// Solver status when redundancy reduction ran
    pub reduction: Option<SolveStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionPolicy {
    pub selection: SelectionConfig,
    pub optimizer: OptimizerConfig,
}

impl SelectionPolicy {
    pub fn new(selection: SelectionConfig, optimizer: OptimizerConfig) -> Self {
        Self {
            selection,
            optimizer,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.selection.clone(), config.optimizer.clone())
    }

    /// Select runnables for one push
    pub fn apply(&self, scores: &Scores, map: &CoOccurrenceMap, cost: &dyn CostModel) -> Selection {
        let mut selected: BTreeSet<Runnable> = scores
            .iter()
            .filter(|(_, score)| **score >= self.selection.confidence_threshold)
            .map(|(runnable, _)| runnable.clone())
            .collect();

        let mut reduction = None;
        if self.selection.reduce {
            let outcome =
                RedundancyOptimizer::new(map, self.optimizer.clone()).reduce(&selected, cost);
            reduction = Some(outcome.status);
            selected = outcome.selected;
        }

        if let Some(minimum) = self.selection.minimum {
            if selected.len() < minimum {
                let missing = minimum - selected.len();
                let extra: Vec<Runnable> = by_descending_score(scores)
                    .filter(|runnable| !selected.contains(*runnable))
                    .take(missing)
                    .cloned()
                    .collect();
                selected.extend(extra);
            }
        }

        if let Some(cap) = self.selection.cap {
            if selected.len() > cap {
                selected = by_descending_score(scores)
                    .filter(|runnable| selected.contains(*runnable))
                    .take(cap)
                    .cloned()
                    .collect();
            }
        }

        Selection {
            selected,
            reduction,
        }
    }
}

/// Runnables from highest to lowest score, ties by name
fn by_descending_score(scores: &Scores) -> impl Iterator<Item = &Runnable> {
    let mut ranked: Vec<(&Runnable, f64)> = scores.iter().map(|(r, s)| (r, *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(runnable, _)| runnable)
}

/// Apply `policy` to many pushes concurrently
///
/// Results are returned in request order.
pub fn select_batch<C>(
    policy: &SelectionPolicy,
    requests: &[Scores],
    map: &CoOccurrenceMap,
    cost: &C,
) -> Vec<Selection>
where
    C: CostModel + Sync,
{
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    select_batch_with_workers(policy, requests, map, cost, workers)
}

pub fn select_batch_with_workers<C>(
    policy: &SelectionPolicy,
    requests: &[Scores],
    map: &CoOccurrenceMap,
    cost: &C,
    workers: usize,
) -> Vec<Selection>
where
    C: CostModel + Sync,
{
    if requests.is_empty() {
        return Vec::new();
    }

    let queue = ArrayQueue::new(requests.len());
    for index in 0..requests.len() {
        // Capacity equals the number of requests.
        let _ = queue.push(index);
    }

    let workers = workers.clamp(1, requests.len());
    tracing::debug!(
        "Selecting tests for {} pushes on {} workers",
        requests.len(),
        workers
    );

    let scoped = crossbeam::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let queue = &queue;
                scope.spawn(move |_| {
                    let mut done = Vec::new();
                    while let Some(index) = queue.pop() {
                        done.push((index, policy.apply(&requests[index], map, cost)));
                    }
                    done
                })
            })
            .collect();

        let mut results: Vec<Option<Selection>> = vec![None; requests.len()];
        for handle in handles {
            match handle.join() {
                Ok(done) => {
                    for (index, selection) in done {
                        results[index] = Some(selection);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        results
    });

    match scoped {
        Ok(results) => results.into_iter().flatten().collect(),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
