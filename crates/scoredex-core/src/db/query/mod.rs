//! Module: db::query
//! Responsibility: immutable sorted-view descriptors and their store binding.
//! Does not own: index maintenance or record storage.
//! Boundary: `SortedIndexes::sorted_find` is the only way in.

mod set;

#[cfg(test)]
mod tests;

pub use set::{Slice, SortedIter, SortedSet};

use crate::db::{
    key::IndexKey,
    store::{Direction, ScoreRange, Window},
};
use std::{fmt, ops::RangeInclusive};

///
/// SortedQuery
///
/// Pure description of a view over one sorted set: optional score range,
/// result window and direction. Every builder returns a new value; no
/// store access happens here.
///
/// The range is held in iteration order, `(first, last)`, so reversing a
/// view swaps the endpoints and `between` / `reverse` commute.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SortedQuery {
    key: IndexKey,
    range: Option<(f64, f64)>,
    window: Window,
    reversed: bool,
}

impl SortedQuery {
    /// Full, ascending, unwindowed view of `key`.
    #[must_use]
    pub const fn new(key: IndexKey) -> Self {
        Self {
            key,
            range: None,
            window: Window::ALL,
            reversed: false,
        }
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Restrict to scores in `[low, high]`, inclusive on both ends.
    #[must_use]
    pub fn between(mut self, low: impl Into<f64>, high: impl Into<f64>) -> Self {
        let (low, high) = (low.into(), high.into());
        self.range = Some(if self.reversed {
            (high, low)
        } else {
            (low, high)
        });
        self
    }

    /// `between` over an inclusive range literal.
    #[must_use]
    pub fn range<T: Into<f64> + Copy>(self, range: RangeInclusive<T>) -> Self {
        let (low, high) = (*range.start(), *range.end());
        self.between(low, high)
    }

    /// Replace the window. `count: None` keeps everything past `offset`.
    #[must_use]
    pub const fn slice(mut self, offset: usize, count: Option<usize>) -> Self {
        self.window = Window::new(offset, count);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.window.offset = offset;
        self
    }

    #[must_use]
    pub const fn limit(mut self, count: usize) -> Self {
        self.window.count = Some(count);
        self
    }

    /// Flip direction; applying it twice restores the original view.
    #[must_use]
    pub fn reverse(mut self) -> Self {
        self.reversed = !self.reversed;
        self.range = self.range.map(|(first, last)| (last, first));
        self
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn key(&self) -> &IndexKey {
        &self.key
    }

    /// Score range in iteration order, if restricted.
    #[must_use]
    pub const fn score_range(&self) -> Option<(f64, f64)> {
        self.range
    }

    #[must_use]
    pub const fn window(&self) -> Window {
        self.window
    }

    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversed
    }

    #[must_use]
    pub const fn is_ranged(&self) -> bool {
        self.range.is_some()
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        if self.reversed {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    /// Store-facing bounds, always `min` then `max`.
    #[must_use]
    pub fn physical_range(&self) -> ScoreRange {
        match self.range {
            None => ScoreRange::UNBOUNDED,
            Some((first, last)) if self.reversed => ScoreRange::new(last, first),
            Some((first, last)) => ScoreRange::new(first, last),
        }
    }
}

impl fmt::Display for SortedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;

        if let Some((first, last)) = self.range {
            write!(f, " [{first}, {last}]")?;
        }

        match self.window.count {
            _ if self.window.is_all() => {}
            Some(count) => write!(f, " offset {} limit {count}", self.window.offset)?,
            None => write!(f, " offset {}", self.window.offset)?,
        }

        if self.reversed {
            write!(f, " desc")?;
        }

        Ok(())
    }
}
