//! Testwise - history-mined features and redundancy-aware CI test selection
//!
//! This library turns a chronological stream of commits and CI pushes into
//! the features a failure classifier needs, and turns classifier output
//! into a compact test schedule:
//!
//! - [`experience`]: how much prior activity the author, reviewers, files
//!   and directories of a commit have, in total and over a recent window
//! - [`failure_history`]: how often each test regressed before, overall and
//!   on pushes touching the same types, files and directories
//! - [`cooccurrence`]: pairwise support and confidence of joint failures
//! - [`redundancy`]: equivalence sets and a weighted covering that drops
//!   tests which historically fail together
//! - [`selection`]: thresholds, minimum and cap on top of the reduction
//!
//! Features leave the crate as [`records::FeatureRecord`] JSON lines; the
//! long-lived state can be persisted with [`checkpoint`].
//!
//! Both feature aggregators are built on [`temporal_counter::TemporalCounter`],
//! a fixed-size sliding window of cumulative values.

pub mod checkpoint;
pub mod commit;
pub mod config;
pub mod cooccurrence;
pub mod error;
pub mod experience;
pub mod failure_history;
pub mod metrics;
pub mod records;
pub mod redundancy;
pub mod selection;
pub mod temporal_counter;

pub use error::{FeatureError, Result};
