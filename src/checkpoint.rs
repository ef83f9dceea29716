//! Checkpoints for incremental runs
//!
//! The failure history of a long push range is expensive to rebuild, and the
//! co-occurrence map is produced by a separate mining job. Both are stored as
//! MessagePack (`rmp-serde`) inside a small envelope carrying a format
//! version and metadata, so a stale or foreign file is rejected instead of
//! being misread.

use crate::cooccurrence::CoOccurrenceMap;
use crate::failure_history::FailureHistory;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Bumped whenever a checkpointed type changes shape
pub const FORMAT_VERSION: u32 = 1;

/// Errors that can occur while saving or loading a checkpoint
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to encode checkpoint: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode checkpoint: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Checkpoint format mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Checkpoint holds {found:?}, expected {expected:?}")]
    KindMismatch {
        expected: CheckpointKind,
        found: CheckpointKind,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// What a checkpoint contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    FailureHistory,
    CoOccurrence,
}

/// Metadata stored next to the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub kind: CheckpointKind,
    /// Crate version that wrote the checkpoint
    pub testwise_version: String,
    /// Unix seconds
    pub created_at: u64,
    pub description: Option<String>,
}

impl CheckpointMetadata {
    pub fn new(kind: CheckpointKind) -> Self {
        Self {
            kind,
            testwise_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: unix_timestamp(),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

fn unix_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    format_version: u32,
    metadata: &'a CheckpointMetadata,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
    metadata: CheckpointMetadata,
}

#[derive(Deserialize)]
struct OwnedEnvelope<T> {
    metadata: CheckpointMetadata,
    payload: T,
}

/// Encode `payload` with its envelope
pub fn to_bytes<T: Serialize>(payload: &T, metadata: &CheckpointMetadata) -> Result<Vec<u8>> {
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        metadata,
        payload,
    };
    Ok(rmp_serde::to_vec_named(&envelope)?)
}

/// Decode a payload of the given kind, checking version and kind first
pub fn from_bytes<T: DeserializeOwned>(
    bytes: &[u8],
    kind: CheckpointKind,
) -> Result<(T, CheckpointMetadata)> {
    let header: Header = rmp_serde::from_slice(bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(CheckpointError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: header.format_version,
        });
    }
    if header.metadata.kind != kind {
        return Err(CheckpointError::KindMismatch {
            expected: kind,
            found: header.metadata.kind,
        });
    }

    let envelope: OwnedEnvelope<T> = rmp_serde::from_slice(bytes)?;
    Ok((envelope.payload, envelope.metadata))
}

fn save<T: Serialize>(payload: &T, kind: CheckpointKind, path: &Path) -> Result<()> {
    let bytes = to_bytes(payload, &CheckpointMetadata::new(kind))?;
    fs::write(path, &bytes)?;
    tracing::info!(
        "Saved {:?} checkpoint ({} bytes) to {}",
        kind,
        bytes.len(),
        path.display()
    );
    Ok(())
}

fn load<T: DeserializeOwned>(kind: CheckpointKind, path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(CheckpointError::FileNotFound(path.display().to_string()));
    }

    let bytes = fs::read(path)?;
    let (payload, metadata) = from_bytes(&bytes, kind)?;
    tracing::info!(
        "Loaded {:?} checkpoint written by testwise {} at {}",
        kind,
        metadata.testwise_version,
        metadata.created_at
    );
    Ok(payload)
}

/// Save the failure history (counters, push counter, runnable registry)
pub fn save_failure_history(history: &FailureHistory, path: impl AsRef<Path>) -> Result<()> {
    save(history, CheckpointKind::FailureHistory, path.as_ref())
}

/// Load a failure history to resume at its next push
pub fn load_failure_history(path: impl AsRef<Path>) -> Result<FailureHistory> {
    load(CheckpointKind::FailureHistory, path.as_ref())
}

pub fn save_cooccurrence_map(map: &CoOccurrenceMap, path: impl AsRef<Path>) -> Result<()> {
    save(map, CheckpointKind::CoOccurrence, path.as_ref())
}

pub fn load_cooccurrence_map(path: impl AsRef<Path>) -> Result<CoOccurrenceMap> {
    load(CheckpointKind::CoOccurrence, path.as_ref())
}
