// Runnables and push outcomes fed to the miner

use serde::{Deserialize, Serialize};
use std::fmt;

/// A CI work unit tracked for pass/fail outcome
///
/// At label granularity only `name` matters. At config-group granularity
/// `name` is the group (the logical test) and `config` the platform it ran
/// on; two runnables are only compared when they share a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Runnable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl Runnable {
    pub fn label(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    pub fn in_config(name: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Some(config.into()),
        }
    }

    /// Group this runnable belongs to at config-group granularity
    pub fn group(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Runnable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config {
            Some(config) => write!(f, "{}@{}", self.name, config),
            None => f.write_str(&self.name),
        }
    }
}

/// How pairs of runnables are formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Every runnable is compared with every other
    Label,
    /// Only configurations of the same group are compared
    ConfigGroup,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Label => f.write_str("label"),
            Granularity::ConfigGroup => f.write_str("config_group"),
        }
    }
}

/// Test outcomes of one push
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushOutcome {
    /// Revisions in the push, newest first
    pub revisions: Vec<String>,

    /// Runnables that ran on the push
    #[serde(default)]
    pub runnables: Vec<Runnable>,

    /// Runnables that failed because of the push
    #[serde(default)]
    pub failures: Vec<Runnable>,
}
