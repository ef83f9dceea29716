//! Errors that abort a feature-extraction pass

use crate::temporal_counter::OrderingViolation;
use thiserror::Error;

/// Fatal errors raised while aggregating history
///
/// Everything recoverable (missing rename history, missing code metrics,
/// solver failures) is logged and degraded instead of surfacing here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("commit {node} is dated before the first commit of the batch ({seconds}s earlier)")]
    CommitBeforeBatchStart { node: String, seconds: i64 },

    #[error("out-of-order history at {context}: {source}")]
    Ordering {
        context: String,
        #[source]
        source: OrderingViolation,
    },
}

/// Result type for feature extraction
pub type Result<T> = std::result::Result<T, FeatureError>;
