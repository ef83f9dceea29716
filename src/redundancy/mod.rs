// Redundancy reduction for test selection
//
// Candidates that historically fail together are grouped into (possibly
// overlapping) equivalence sets, and a weighted set covering picks the
// cheapest subset that keeps at least one runnable per set. The reduction
// never drops tests when the covering cannot be solved.

mod equivalence;
mod optimizer;
mod solver;

pub use equivalence::EquivalenceSets;
pub use optimizer::{select_tests, CostModel, RedundancyOptimizer, SelectionOutcome, UniformCost};
pub use solver::{BranchAndBound, CoverProblem, CoverSolution, CoverSolver, SolveStatus};
