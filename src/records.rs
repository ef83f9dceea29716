//! Feature records handed to the classifiers
//!
//! Records are flat `name -> value` maps keyed by what they describe, stored
//! as JSON lines so training jobs can stream them.

use crate::experience::CommitExperience;
use crate::failure_history::FailureFeatures;
use crate::metrics::CommitMetrics;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, RecordError>;

/// One classifier input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Revision for commit records, `push/test` for failure records
    pub key: String,
    pub features: BTreeMap<String, f64>,
    /// Training label, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<bool>,
}

impl FeatureRecord {
    /// Add code-metric features to a commit record
    pub fn with_metrics(mut self, metrics: &CommitMetrics) -> Self {
        self.features.extend(metrics.to_feature_map());
        self
    }
}

impl From<&CommitExperience> for FeatureRecord {
    fn from(experience: &CommitExperience) -> Self {
        Self {
            key: experience.node.clone(),
            features: experience.to_feature_map(),
            label: None,
        }
    }
}

impl From<&FailureFeatures> for FeatureRecord {
    fn from(features: &FailureFeatures) -> Self {
        Self {
            key: format!("{}/{}", features.push_num, features.test),
            features: features.to_feature_map(),
            label: Some(features.is_failure),
        }
    }
}

/// Write one JSON object per line, returning the number of records
pub fn write_json_lines<'a, W, T, I>(mut writer: W, records: I) -> Result<usize>
where
    W: Write,
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut written = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|source| RecordError::Json {
            line: written + 1,
            source,
        })?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} feature records", written);
    Ok(written)
}

/// Read records written by [`write_json_lines`], skipping blank lines
pub fn read_json_lines<R: BufRead, T: DeserializeOwned>(reader: R) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line).map_err(|source| RecordError::Json {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}
