// Weighted set covering with a wall-clock budget
//
// Problems are small (one variable per candidate test, one constraint per
// equivalence set) and usually solve in microseconds. The branch-and-bound
// search picks the first unsatisfied set, tries its members cheapest first
// and prunes with a lower bound built from pairwise disjoint unsatisfied
// sets.

use std::time::{Duration, Instant};

/// Minimize total cost subject to covering every set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverProblem {
    /// Cost per variable
    pub costs: Vec<u64>,
    /// Variable indices per set
    pub sets: Vec<Vec<usize>>,
    /// Each set must contain exactly one selected variable instead of at least one
    pub exact: bool,
}

impl CoverProblem {
    pub fn variables(&self) -> usize {
        self.costs.len()
    }

    /// Whether `selected` satisfies every constraint
    pub fn is_satisfied_by(&self, selected: &[usize]) -> bool {
        self.sets.iter().all(|set| {
            let chosen = set.iter().filter(|v| selected.contains(v)).count();
            if self.exact {
                chosen == 1
            } else {
                chosen >= 1
            }
        })
    }

    pub fn cost_of(&self, selected: &[usize]) -> u64 {
        selected.iter().map(|v| self.costs[*v]).sum()
    }
}

/// How a solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Search completed, the solution is optimal
    Optimal,
    /// Budget exhausted with a valid but possibly suboptimal solution
    Feasible,
    /// Search completed without any valid solution
    Infeasible,
    /// Budget exhausted before any valid solution was found
    NotSolved,
}

impl SolveStatus {
    /// Whether the solution can be used
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverSolution {
    pub status: SolveStatus,
    /// Selected variable indices, ascending (empty without a solution)
    pub selected: Vec<usize>,
    pub cost: u64,
}

impl CoverSolution {
    fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            selected: Vec::new(),
            cost: 0,
        }
    }
}

/// Solver seam used by the optimizer
pub trait CoverSolver: Send + Sync {
    fn solve(&self, problem: &CoverProblem, budget: Duration) -> CoverSolution;
}

/// Exact depth-first branch and bound
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl CoverSolver for BranchAndBound {
    fn solve(&self, problem: &CoverProblem, budget: Duration) -> CoverSolution {
        let deadline = Instant::now() + budget;
        if Instant::now() >= deadline {
            return CoverSolution::without_solution(SolveStatus::NotSolved);
        }

        let mut search = Search::new(problem, deadline);
        let completed = search.run();

        match (search.best, completed) {
            (Some((cost, selected)), true) => CoverSolution {
                status: SolveStatus::Optimal,
                selected,
                cost,
            },
            (Some((cost, selected)), false) => CoverSolution {
                status: SolveStatus::Feasible,
                selected,
                cost,
            },
            (None, true) => CoverSolution::without_solution(SolveStatus::Infeasible),
            (None, false) => CoverSolution::without_solution(SolveStatus::NotSolved),
        }
    }
}

struct Search<'a> {
    problem: &'a CoverProblem,
    deadline: Instant,
    /// Sets containing each variable
    memberships: Vec<Vec<usize>>,
    /// Members of each set, cheapest first
    sorted_sets: Vec<Vec<usize>>,
    coverage: Vec<usize>,
    chosen: Vec<bool>,
    excluded: Vec<bool>,
    cost: u64,
    best: Option<(u64, Vec<usize>)>,
    timed_out: bool,
}

impl<'a> Search<'a> {
    fn new(problem: &'a CoverProblem, deadline: Instant) -> Self {
        let variables = problem.variables();
        let mut memberships = vec![Vec::new(); variables];
        let mut sorted_sets = Vec::with_capacity(problem.sets.len());

        for (index, set) in problem.sets.iter().enumerate() {
            let mut members: Vec<usize> = set.clone();
            members.sort_by_key(|v| (problem.costs[*v], *v));
            members.dedup();
            for member in &members {
                memberships[*member].push(index);
            }
            sorted_sets.push(members);
        }

        Self {
            problem,
            deadline,
            memberships,
            sorted_sets,
            coverage: vec![0; problem.sets.len()],
            chosen: vec![false; variables],
            excluded: vec![false; variables],
            cost: 0,
            best: None,
            timed_out: false,
        }
    }

    /// Returns false if the deadline interrupted the search
    fn run(&mut self) -> bool {
        self.branch();
        !self.timed_out
    }

    fn can_choose(&self, variable: usize) -> bool {
        if self.excluded[variable] || self.chosen[variable] {
            return false;
        }
        // Exact sets already covered must not be covered twice.
        !self.problem.exact || self.memberships[variable].iter().all(|s| self.coverage[*s] == 0)
    }

    /// Lower bound on the cost still needed, or `None` if some set is uncoverable
    fn remaining_bound(&self) -> Option<u64> {
        let mut used = vec![false; self.problem.variables()];
        let mut bound = 0;

        for (index, members) in self.sorted_sets.iter().enumerate() {
            if self.coverage[index] > 0 {
                continue;
            }

            let mut eligible = members.iter().filter(|v| self.can_choose(**v)).peekable();
            let cheapest = eligible.peek().copied()?;
            if members.iter().any(|v| used[*v]) {
                continue;
            }

            bound += self.problem.costs[*cheapest];
            for member in members {
                used[*member] = true;
            }
        }

        Some(bound)
    }

    fn branch(&mut self) {
        if self.timed_out {
            return;
        }
        if Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }

        let Some(bound) = self.remaining_bound() else {
            return;
        };
        if let Some((best, _)) = &self.best {
            if self.cost + bound >= *best {
                return;
            }
        }

        let Some(open) = (0..self.sorted_sets.len()).find(|s| self.coverage[*s] == 0) else {
            let selected = (0..self.chosen.len()).filter(|v| self.chosen[*v]).collect();
            self.best = Some((self.cost, selected));
            return;
        };

        let members = self.sorted_sets[open].clone();
        let mut newly_excluded = Vec::new();

        for variable in members {
            if !self.can_choose(variable) {
                continue;
            }

            self.choose(variable, true);
            self.branch();
            self.choose(variable, false);

            if self.timed_out {
                break;
            }

            // Later branches cover this set without `variable`.
            self.excluded[variable] = true;
            newly_excluded.push(variable);
        }

        for variable in newly_excluded {
            self.excluded[variable] = false;
        }
    }

    fn choose(&mut self, variable: usize, select: bool) {
        let cost = self.problem.costs[variable];
        self.chosen[variable] = select;

        if select {
            self.cost += cost;
            for set in &self.memberships[variable] {
                self.coverage[*set] += 1;
            }
        } else {
            self.cost -= cost;
            for set in &self.memberships[variable] {
                self.coverage[*set] -= 1;
            }
        }
    }
}
