//! Bucket-indexed sliding window counter
//!
//! `TemporalCounter` keeps one value per time bucket (a day for experience,
//! a group of 100 pushes for failure history) in a fixed-length window. Only
//! the newest `length` buckets are stored, so memory stays bounded no matter
//! how long the history is.
//!
//! # Semantics
//!
//! ```text
//!  anchor                            last = anchor + length - 1
//!    │                                 │
//!    ▼                                 ▼
//!  ┌─────┬─────┬─────┬─────┬─────┬─────┐
//!  │ v0  │ v1  │ v2  │ v3  │ v4  │ v5  │ ──► get(b > last) = v5
//!  └─────┴─────┴─────┴─────┴─────┴─────┘
//!    ▲
//!    └── get(b < anchor) clamps here
//! ```
//!
//! Buckets that were never written hold the value of the newest write before
//! them (flat extrapolation), so a windowed delta `get(b) - get(b - k)` counts
//! exactly the accumulation of the last `k` buckets, even across gaps.
//!
//! Writes only move forward: writing a bucket older than `last` is an
//! [`OrderingViolation`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// A write targeted a bucket older than the newest one in the window
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot write bucket {bucket}: window already advanced to bucket {last}")]
pub struct OrderingViolation {
    pub bucket: i64,
    pub last: i64,
}

/// Fixed-length sliding window of per-bucket values
///
/// # Example
///
/// ```
/// use testwise::temporal_counter::TemporalCounter;
///
/// let mut counter = TemporalCounter::ending_at(0, 91, 0u64);
/// counter.set(3, 1).unwrap();
/// counter.set(10, 2).unwrap();
///
/// assert_eq!(counter.get(5), 1); // flat between writes
/// assert_eq!(counter.get(500), 2); // newest value past the window
/// assert_eq!(counter.get(10) - counter.get(10 - 90), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalCounter<V> {
    buckets: VecDeque<V>,
    anchor: i64,
    default: V,
}

impl<V: Clone> TemporalCounter<V> {
    /// Create a window whose oldest bucket is `anchor`
    ///
    /// Every bucket starts at `default`.
    ///
    /// # Panics
    ///
    /// Panics if `length` is 0.
    pub fn new(anchor: i64, length: usize, default: V) -> Self {
        assert!(length > 0, "TemporalCounter length must be > 0");

        let mut buckets = VecDeque::with_capacity(length);
        buckets.resize(length, default.clone());

        Self {
            buckets,
            anchor,
            default,
        }
    }

    /// Create a window whose newest bucket is `last`
    ///
    /// This is how the aggregators create counters lazily: the first bucket
    /// referenced becomes the newest one.
    pub fn ending_at(last: i64, length: usize, default: V) -> Self {
        Self::new(last - (length as i64 - 1), length, default)
    }

    /// Bucket index of the oldest stored value
    pub fn anchor(&self) -> i64 {
        self.anchor
    }

    /// Bucket index of the newest stored value
    pub fn last(&self) -> i64 {
        self.anchor + self.buckets.len() as i64 - 1
    }

    /// Number of buckets in the window
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always false; a window holds at least one bucket
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Value the counter reports for buckets before any history
    pub fn default_value(&self) -> &V {
        &self.default
    }

    /// Value of bucket `bucket`
    ///
    /// Queries older than the window clamp to the oldest stored bucket. A
    /// query for a negative bucket (after clamping) predates every possible
    /// write and yields the default. Queries newer than the window yield the
    /// newest value. Use [`checked_get`](Self::checked_get) to tell the
    /// clamped case apart.
    pub fn get(&self, bucket: i64) -> V {
        let bucket = bucket.max(self.anchor);

        if bucket < 0 {
            return self.default.clone();
        }

        if bucket > self.last() {
            return self.newest().clone();
        }

        self.buckets[(bucket - self.anchor) as usize].clone()
    }

    /// Value of bucket `bucket`, or `None` if it predates the window
    ///
    /// Negative buckets are reported as `None` as well.
    pub fn checked_get(&self, bucket: i64) -> Option<&V> {
        if bucket < self.anchor || bucket < 0 {
            return None;
        }

        if bucket > self.last() {
            return Some(self.newest());
        }

        self.buckets.get((bucket - self.anchor) as usize)
    }

    /// Write `value` at `bucket`
    ///
    /// Writing the newest bucket overwrites it. Writing past the window
    /// slides it forward: the skipped buckets take the previous newest value,
    /// and the oldest buckets are evicted so the length is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingViolation`] if `bucket` is older than the newest
    /// bucket.
    pub fn set(&mut self, bucket: i64, value: V) -> Result<(), OrderingViolation> {
        let last = self.last();

        if bucket < last {
            return Err(OrderingViolation { bucket, last });
        }

        if bucket == last {
            if let Some(newest) = self.buckets.back_mut() {
                *newest = value;
            }
            return Ok(());
        }

        let shift = bucket - last;
        let length = self.buckets.len();
        // Buckets that would be evicted again before the append are skipped.
        let fill = (shift - 1).min(length as i64 - 1) as usize;
        let carried = self.newest().clone();

        for _ in 0..fill {
            self.buckets.pop_front();
            self.buckets.push_back(carried.clone());
        }
        self.buckets.pop_front();
        self.buckets.push_back(value);

        self.anchor += shift;
        debug_assert_eq!(self.last(), bucket);
        Ok(())
    }

    fn newest(&self) -> &V {
        self.buckets.back().unwrap_or(&self.default)
    }
}
