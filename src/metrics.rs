//! Code-metric features of a commit
//!
//! Metrics come from an external analysis service behind [`MetricsSource`].
//! The service is passed in explicitly; a file it cannot analyze is skipped
//! and never fails the commit.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Metrics of one file as reported by the analysis service
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    /// Source lines of code
    pub sloc: f64,
    pub cyclomatic: f64,
    pub functions: f64,
}

/// Per-file code metrics provider
pub trait MetricsSource {
    /// `None` when the file could not be analyzed
    fn file_metrics(&self, path: &str) -> Option<FileMetrics>;
}

impl<S: BuildHasher> MetricsSource for HashMap<String, FileMetrics, S> {
    fn file_metrics(&self, path: &str) -> Option<FileMetrics> {
        self.get(path).copied()
    }
}

impl MetricsSource for BTreeMap<String, FileMetrics> {
    fn file_metrics(&self, path: &str) -> Option<FileMetrics> {
        self.get(path).copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub total: f64,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
}

impl MetricSummary {
    fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let total: f64 = values.iter().sum();
        Self {
            total,
            avg: total / values.len() as f64,
            max: values.iter().copied().fold(f64::MIN, f64::max),
            min: values.iter().copied().fold(f64::MAX, f64::min),
        }
    }
}

/// Summaries over the analyzed files of a commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitMetrics {
    /// Files the service returned metrics for
    pub analyzed_files: usize,
    /// Files the service could not analyze
    pub skipped_files: usize,
    pub sloc: MetricSummary,
    pub cyclomatic: MetricSummary,
    pub functions: MetricSummary,
}

impl CommitMetrics {
    /// Flat feature map, e.g. `cyclomatic_max`
    pub fn to_feature_map(&self) -> BTreeMap<String, f64> {
        let mut features = BTreeMap::new();
        for (name, summary) in [
            ("sloc", &self.sloc),
            ("cyclomatic", &self.cyclomatic),
            ("functions", &self.functions),
        ] {
            features.insert(format!("{}_total", name), summary.total);
            features.insert(format!("{}_avg", name), summary.avg);
            features.insert(format!("{}_max", name), summary.max);
            features.insert(format!("{}_min", name), summary.min);
        }
        features
    }
}

/// Summarize the metrics of `files`
///
/// A commit where no file could be analyzed gets all-zero summaries.
pub fn summarize_commit_metrics<S: AsRef<str>>(
    source: &dyn MetricsSource,
    files: &[S],
) -> CommitMetrics {
    let mut analyzed = Vec::with_capacity(files.len());

    for file in files {
        match source.file_metrics(file.as_ref()) {
            Some(metrics) => analyzed.push(metrics),
            None => tracing::debug!("No code metrics for {}, skipping", file.as_ref()),
        }
    }

    let column = |pick: fn(&FileMetrics) -> f64| analyzed.iter().map(pick).collect::<Vec<f64>>();

    CommitMetrics {
        analyzed_files: analyzed.len(),
        skipped_files: files.len() - analyzed.len(),
        sloc: MetricSummary::of(&column(|m| m.sloc)),
        cyclomatic: MetricSummary::of(&column(|m| m.cyclomatic)),
        functions: MetricSummary::of(&column(|m| m.functions)),
    }
}
