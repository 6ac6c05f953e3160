//! Module: db::store
//! Responsibility: the score-ordered set port consumed by maintenance and queries.
//! Does not own: connections, pooling, or retry policy.
//! Boundary: every call is one atomic single-key operation and independently fallible.

mod memory;


pub use memory::MemoryStore;

use crate::error::ErrorClass;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// StoreError
///
/// Failure reported by a store implementation. Propagated unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("store transport error: {message}")]
    Transport { message: String },

    #[error("store call timed out after {millis}ms")]
    Timeout { millis: u64 },
}

impl StoreError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Unavailable { .. } | Self::Timeout { .. } => ErrorClass::Unavailable,
            Self::Transport { .. } => ErrorClass::Internal,
        }
    }

    /// Whether a retry by the caller could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

///
/// Direction
///
/// Traversal direction of a score range query.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

///
/// ScoreRange
///
/// Inclusive physical score bounds, always `min` then `max`.
/// A range with `min > max` selects nothing.
///

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, score: f64) -> bool {
        self.min <= score && score <= self.max
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

///
/// Window
///
/// Result window applied after range selection.
/// `count: None` means unbounded (the store-level `-1`).
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Window {
    pub offset: usize,
    pub count: Option<usize>,
}

impl Window {
    pub const ALL: Self = Self {
        offset: 0,
        count: None,
    };

    #[must_use]
    pub const fn new(offset: usize, count: Option<usize>) -> Self {
        Self { offset, count }
    }

    /// Number of entries this window keeps out of `total`.
    #[must_use]
    pub fn clamp(&self, total: usize) -> usize {
        let remaining = total.saturating_sub(self.offset);
        self.count.map_or(remaining, |count| remaining.min(count))
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.offset == 0 && self.count.is_none()
    }
}

///
/// SortedSetStore
///
/// Score-ordered set primitives. Members are unique per key and ordered by
/// score, ties broken by member bytes. Missing keys behave as empty sets.
///

pub trait SortedSetStore {
    /// Upsert `member` with `score`; always overwrites the score.
    fn add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError>;

    /// Remove `member`; no-op when absent.
    fn remove(&self, key: &str, member: &str) -> Result<(), StoreError>;

    fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError>;

    /// 0-based ascending rank of `member`.
    fn rank_of(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError>;

    fn cardinality(&self, key: &str) -> Result<usize, StoreError>;

    fn count_in_range(&self, key: &str, range: ScoreRange) -> Result<usize, StoreError>;

    /// Members by ascending rank, inclusive; negative indices count from the end.
    fn range_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError>;

    /// Members whose score lies in `range`, in `direction`, windowed.
    fn range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        window: Window,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError>;
}

impl<S: SortedSetStore + ?Sized> SortedSetStore for &S {
    fn add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        (**self).add(key, score, member)
    }

    fn remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        (**self).remove(key, member)
    }

    fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        (**self).score_of(key, member)
    }

    fn rank_of(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError> {
        (**self).rank_of(key, member)
    }

    fn cardinality(&self, key: &str) -> Result<usize, StoreError> {
        (**self).cardinality(key)
    }

    fn count_in_range(&self, key: &str, range: ScoreRange) -> Result<usize, StoreError> {
        (**self).count_in_range(key, range)
    }

    fn range_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        (**self).range_by_rank(key, start, stop)
    }

    fn range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        window: Window,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError> {
        (**self).range_by_score(key, range, window, direction)
    }
}
