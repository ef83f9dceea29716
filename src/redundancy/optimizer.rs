// Redundancy reduction over a candidate test set

use crate::config::{CostTable, OptimizerConfig};
use crate::cooccurrence::{CoOccurrenceMap, Runnable};
use crate::redundancy::equivalence::EquivalenceSets;
use crate::redundancy::solver::{BranchAndBound, CoverProblem, CoverSolver, SolveStatus};
use std::collections::BTreeSet;

/// Cost of scheduling a runnable
pub trait CostModel {
    fn cost(&self, runnable: &Runnable) -> u64;
}

impl<F> CostModel for F
where
    F: Fn(&Runnable) -> u64,
{
    fn cost(&self, runnable: &Runnable) -> u64 {
        self(runnable)
    }
}

/// Matches rules against `name@config`
impl CostModel for CostTable {
    fn cost(&self, runnable: &Runnable) -> u64 {
        CostTable::cost(self, &runnable.to_string())
    }
}

/// Every runnable costs 1
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCost;

impl CostModel for UniformCost {
    fn cost(&self, _runnable: &Runnable) -> u64 {
        1
    }
}

/// Result of one reduction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionOutcome {
    pub selected: BTreeSet<Runnable>,
    pub status: SolveStatus,
    /// Number of equivalence sets the covering was built from
    pub equivalence_sets: usize,
    /// Whether the sets were pairwise disjoint (exact constraints)
    pub exact: bool,
}

impl SelectionOutcome {
    /// Whether the candidates were returned unreduced because the solve failed
    pub fn is_fallback(&self) -> bool {
        !self.status.has_solution()
    }
}

/// Picks the cheapest subset of candidates covering every equivalence set
pub struct RedundancyOptimizer<'a, S = BranchAndBound> {
    map: &'a CoOccurrenceMap,
    config: OptimizerConfig,
    solver: S,
}

impl<'a> RedundancyOptimizer<'a, BranchAndBound> {
    pub fn new(map: &'a CoOccurrenceMap, config: OptimizerConfig) -> Self {
        Self::with_solver(map, config, BranchAndBound)
    }
}

impl<'a, S: CoverSolver> RedundancyOptimizer<'a, S> {
    pub fn with_solver(map: &'a CoOccurrenceMap, config: OptimizerConfig, solver: S) -> Self {
        Self {
            map,
            config,
            solver,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn equivalence_sets(&self, candidates: &BTreeSet<Runnable>) -> EquivalenceSets {
        EquivalenceSets::build(
            candidates,
            self.map,
            self.config.min_confidence,
            self.config.assume_redundant,
        )
    }

    /// Reduce `candidates`
    ///
    /// Never under-selects: if the covering cannot be solved within the time
    /// budget, or has no solution, every candidate is returned.
    pub fn reduce(
        &self,
        candidates: &BTreeSet<Runnable>,
        cost: &dyn CostModel,
    ) -> SelectionOutcome {
        let sets = self.equivalence_sets(candidates);
        let exact = sets.is_disjoint();

        let tasks: Vec<&Runnable> = candidates.iter().collect();
        let problem = CoverProblem {
            costs: tasks.iter().map(|task| cost.cost(task)).collect(),
            sets: sets
                .groups()
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .filter_map(|member| tasks.binary_search(&member).ok())
                        .collect()
                })
                .collect(),
            exact,
        };

        let solution = self.solver.solve(&problem, self.config.time_budget());

        let selected = match solution.status {
            SolveStatus::Optimal | SolveStatus::Feasible => {
                if solution.status == SolveStatus::Feasible {
                    tracing::info!(
                        "Optimization stopped at the time budget, using a suboptimal solution"
                    );
                }
                solution
                    .selected
                    .iter()
                    .map(|index| tasks[*index].clone())
                    .collect()
            }
            SolveStatus::Infeasible => {
                tracing::warn!("Optimization problem is infeasible");
                candidates.clone()
            }
            SolveStatus::NotSolved => {
                tracing::warn!("Optimization problem could not be solved in time");
                candidates.clone()
            }
        };

        tracing::debug!(
            "Reduced {} candidates to {} using {} equivalence sets",
            candidates.len(),
            selected.len(),
            sets.len()
        );

        SelectionOutcome {
            selected,
            status: solution.status,
            equivalence_sets: sets.len(),
            exact,
        }
    }
}

/// Reduce `candidates` to a cheapest non-redundant subset
///
/// # Example
/// ```
/// use std::collections::BTreeSet;
/// use testwise::cooccurrence::{CoOccurrenceMap, Granularity, PairStats, Runnable};
/// use testwise::redundancy::select_tests;
///
/// let mut map = CoOccurrenceMap::new(Granularity::Label);
/// map.insert(Runnable::label("a"), Runnable::label("b"), PairStats { support: 0.5, confidence: 1.0 });
///
/// let candidates: BTreeSet<Runnable> = ["a", "b", "c"].into_iter().map(Runnable::label).collect();
/// let selected = select_tests(&candidates, &map, 0.9, false, |_: &Runnable| 1u64);
///
/// assert_eq!(selected.len(), 2);
/// assert!(selected.contains(&Runnable::label("c")));
/// ```
pub fn select_tests(
    candidates: &BTreeSet<Runnable>,
    map: &CoOccurrenceMap,
    min_confidence: f64,
    assume_redundant: bool,
    cost: impl CostModel,
) -> BTreeSet<Runnable> {
    let config = OptimizerConfig {
        min_confidence,
        assume_redundant,
        ..OptimizerConfig::default()
    };

    RedundancyOptimizer::new(map, config)
        .reduce(candidates, &cost)
        .selected
}
