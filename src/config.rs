//! Tunables for feature extraction and test selection
//!
//! Every constant the aggregators and the optimizer rely on lives here with
//! its historical default, so a deployment can tune windows and thresholds
//! from a TOML file instead of recompiling.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Experience window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    /// Width of the recent-experience window, in days
    ///
    /// Default: 90
    pub window_days: i64,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self { window_days: 90 }
    }
}

impl ExperienceConfig {
    /// Buckets kept per counter: the window plus the current day
    pub fn counter_length(&self) -> usize {
        self.window_days as usize + 1
    }

    /// Suffix used in feature names, e.g. `90_days`
    pub fn window_label(&self) -> String {
        format!("{}_days", self.window_days)
    }
}

/// Past-failure window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureHistoryConfig {
    /// Pushes per bucket
    ///
    /// Default: 100
    pub bucket_width: u64,

    /// Oldest history that must stay queryable, in pushes
    ///
    /// Default: 4500
    pub timespan: u64,

    /// Lookbacks reported as windowed deltas, in pushes
    ///
    /// Each must be a multiple of `bucket_width` no larger than `timespan`.
    /// Default: 700, 1400, 2800
    pub lookbacks: Vec<u64>,
}

impl Default for FailureHistoryConfig {
    fn default() -> Self {
        Self {
            bucket_width: 100,
            timespan: 4500,
            lookbacks: vec![700, 1400, 2800],
        }
    }
}

impl FailureHistoryConfig {
    /// Buckets kept per counter: `ceil(timespan / bucket_width) + 1`
    pub fn counter_length(&self) -> usize {
        self.timespan.div_ceil(self.bucket_width) as usize + 1
    }

    pub fn bucket(&self, push_num: u64) -> i64 {
        (push_num / self.bucket_width) as i64
    }

    /// Lookbacks expressed in buckets
    pub fn lookback_buckets(&self) -> Vec<i64> {
        self.lookbacks
            .iter()
            .map(|pushes| (pushes / self.bucket_width) as i64)
            .collect()
    }
}

/// Co-occurrence mining configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoOccurrenceConfig {
    /// Minimum support for a pair to be kept at label granularity
    ///
    /// Default: 1/700
    pub min_support: f64,

    /// Number of pairs logged in the post-mining summary
    ///
    /// Default: 7
    pub summary_size: usize,
}

impl Default for CoOccurrenceConfig {
    fn default() -> Self {
        Self {
            min_support: 1.0 / 700.0,
            summary_size: 7,
        }
    }
}

/// Redundancy optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Confidence at or above which two tests are considered redundant
    ///
    /// Default: 0.9
    pub min_confidence: f64,

    /// Treat pairs without co-occurrence data as redundant
    ///
    /// Default: false
    pub assume_redundant: bool,

    /// Wall-clock budget for a single covering solve, in milliseconds
    ///
    /// Default: 10000
    pub time_budget_ms: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.9,
            assume_redundant: false,
            time_budget_ms: 10_000,
        }
    }
}

impl OptimizerConfig {
    pub fn time_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.time_budget_ms)
    }
}

/// Post-classification selection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Minimum classifier score for a test to be proposed
    ///
    /// Default: 0.5
    pub confidence_threshold: f64,

    /// Apply redundancy reduction to the proposed tests
    ///
    /// Default: false
    pub reduce: bool,

    /// Top up the selection to at least this many tests
    pub minimum: Option<usize>,

    /// Never select more than this many tests
    pub cap: Option<usize>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            reduce: false,
            minimum: None,
            cap: None,
        }
    }
}

/// Cost rule: a test whose name contains every substring costs `cost`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRule {
    pub substrings: Vec<String>,
    pub cost: u64,
}

/// Per-test cost lookup for the covering objective
///
/// Rules are checked from last to first so later, more specific rules win.
///
/// # Example
/// ```
/// use testwise::config::{CostRule, CostTable};
///
/// let table = CostTable {
///     default_cost: 1,
///     rules: vec![
///         CostRule { substrings: vec!["windows".into()], cost: 4 },
///         CostRule { substrings: vec!["windows".into(), "debug".into()], cost: 5 },
///     ],
/// };
/// assert_eq!(table.cost("windows10/debug-uitest"), 5);
/// assert_eq!(table.cost("linux/opt-cppunit"), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    pub default_cost: u64,
    pub rules: Vec<CostRule>,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            default_cost: 1,
            rules: Vec::new(),
        }
    }
}

impl CostTable {
    pub fn cost(&self, name: &str) -> u64 {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.substrings.iter().all(|s| name.contains(s.as_str())))
            .map(|rule| rule.cost)
            .unwrap_or(self.default_cost)
    }
}

/// Complete configuration
///
/// # Example TOML
/// ```toml
/// [experience]
/// window_days = 90
///
/// [optimizer]
/// min_confidence = 0.9
/// time_budget_ms = 5000
///
/// [[costs.rules]]
/// substrings = ["windows", "debug"]
/// cost = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub experience: ExperienceConfig,
    pub failure_history: FailureHistoryConfig,
    pub cooccurrence: CoOccurrenceConfig,
    pub optimizer: OptimizerConfig,
    pub selection: SelectionConfig,
    pub costs: CostTable,
}

impl Config {
    /// Load and validate a TOML configuration file
    ///
    /// Missing sections and keys fall back to their defaults.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Configuration that only merges tests that always fail together
    pub fn strict() -> Self {
        Self {
            optimizer: OptimizerConfig {
                min_confidence: 1.0,
                ..OptimizerConfig::default()
            },
            ..Self::default()
        }
    }

    /// Configuration that merges aggressively and assumes unseen pairs redundant
    pub fn permissive() -> Self {
        Self {
            optimizer: OptimizerConfig {
                min_confidence: 0.7,
                assume_redundant: true,
                ..OptimizerConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.experience.window_days <= 0 {
            return Err(format!(
                "experience.window_days must be positive, got {}",
                self.experience.window_days
            ));
        }

        let history = &self.failure_history;
        if history.bucket_width == 0 {
            return Err("failure_history.bucket_width must be positive".to_string());
        }
        for lookback in &history.lookbacks {
            if lookback % history.bucket_width != 0 {
                return Err(format!(
                    "failure_history lookback {} is not a multiple of bucket_width {}",
                    lookback, history.bucket_width
                ));
            }
            if *lookback > history.timespan {
                return Err(format!(
                    "failure_history lookback {} exceeds timespan {}",
                    lookback, history.timespan
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.cooccurrence.min_support) {
            return Err(format!(
                "cooccurrence.min_support must be in [0, 1], got {}",
                self.cooccurrence.min_support
            ));
        }

        if !(0.0..=1.0).contains(&self.optimizer.min_confidence) {
            return Err(format!(
                "optimizer.min_confidence must be in [0, 1], got {}",
                self.optimizer.min_confidence
            ));
        }

        if !(0.0..=1.0).contains(&self.selection.confidence_threshold) {
            return Err(format!(
                "selection.confidence_threshold must be in [0, 1], got {}",
                self.selection.confidence_threshold
            ));
        }

        if let (Some(minimum), Some(cap)) = (self.selection.minimum, self.selection.cap) {
            if minimum > cap {
                return Err(format!(
                    "selection.minimum ({}) must not exceed selection.cap ({})",
                    minimum, cap
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.experience.window_days, 90);
        assert_eq!(config.experience.counter_length(), 91);
        assert_eq!(config.failure_history.counter_length(), 46);
        assert_eq!(config.failure_history.lookback_buckets(), vec![7, 14, 28]);
        assert_eq!(config.optimizer.time_budget_ms, 10_000);
        assert!(!config.optimizer.assume_redundant);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert_eq!(Config::strict().optimizer.min_confidence, 1.0);
        assert!(Config::permissive().optimizer.assume_redundant);
        assert!(Config::strict().validate().is_ok());
        assert!(Config::permissive().validate().is_ok());
    }

    #[test]
    fn test_bucket_is_floor() {
        let history = FailureHistoryConfig::default();
        assert_eq!(history.bucket(0), 0);
        assert_eq!(history.bucket(99), 0);
        assert_eq!(history.bucket(100), 1);
        assert_eq!(history.bucket(4567), 45);
    }

    #[test]
    fn test_invalid_lookback() {
        let mut config = Config::default();
        config.failure_history.lookbacks = vec![750];
        assert!(config.validate().is_err());

        config.failure_history.lookbacks = vec![9000];
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_confidence() {
        let mut config = Config::default();
        config.optimizer.min_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimum_above_cap_rejected() {
        let mut config = Config::default();
        config.selection.minimum = Some(10);
        config.selection.cap = Some(5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml_str(
            r#"
            [optimizer]
            min_confidence = 0.8
            time_budget_ms = 250

            [[costs.rules]]
            substrings = ["asan"]
            cost = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.optimizer.min_confidence, 0.8);
        assert_eq!(config.optimizer.time_budget_ms, 250);
        assert_eq!(config.experience.window_days, 90);
        assert_eq!(config.costs.cost("linux-asan/opt"), 14);
        assert_eq!(config.costs.cost("linux/opt"), 1);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        let result = Config::from_toml_str("[experience]\nwindow_days = 0\n");
        assert!(result.is_err());
    }
}
