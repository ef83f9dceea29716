// Historical failure features per (push, test)
//
// For each push and each candidate test this module reports how often the
// test regressed before, overall and on pushes touching the same file types,
// files and directories, in total and over the last 700/1400/2800 pushes.
//
// History is bucketed by 100 pushes, so each counter holds 46 values no
// matter how many pushes have been seen. Counters only exist for
// (scope, test, item) combinations that regressed at least once; everything
// else reads as zero without being stored.

mod history;

pub use history::{
    compute_failure_history_features, FailureFeatures, FailureHistory, FailureKey, FailureScope,
    ScopeFailures, ALL_ITEM,
};

#[cfg(test)]
mod tests;
