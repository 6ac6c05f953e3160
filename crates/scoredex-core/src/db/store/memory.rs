use crate::db::store::{Direction, ScoreRange, SortedSetStore, StoreError, Window};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use std::{
    collections::{BTreeSet, HashMap, btree_set},
    ops::Bound,
};

type Score = OrderedFloat<f64>;

///
/// SortedEntries
///
/// One score-ordered set: a member → score map plus the ordered view.
///

#[derive(Debug, Default)]
struct SortedEntries {
    scores: HashMap<String, Score>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedEntries {
    fn insert(&mut self, member: &str, score: Score) {
        if let Some(previous) = self.scores.insert(member.to_string(), score) {
            self.ordered.remove(&(previous, member.to_string()));
        }
        self.ordered.insert((score, member.to_string()));
    }

    fn remove(&mut self, member: &str) {
        if let Some(previous) = self.scores.remove(member) {
            self.ordered.remove(&(previous, member.to_string()));
        }
    }

    fn rank(&self, member: &str) -> Option<usize> {
        let score = *self.scores.get(member)?;

        Some(self.ordered.range(..(score, member.to_string())).count())
    }

    /// Entries with `min <= score <= max`; `None` when the range is empty.
    fn in_range(&self, range: ScoreRange) -> Option<btree_set::Range<'_, (Score, String)>> {
        if range.min.is_nan() || range.max.is_nan() || range.min > range.max {
            return None;
        }

        let lower = Bound::Included((OrderedFloat(range.min), String::new()));
        let upper = if range.max == f64::INFINITY {
            Bound::Unbounded
        } else {
            Bound::Excluded((OrderedFloat(range.max.next_up()), String::new()))
        };

        Some(self.ordered.range((lower, upper)))
    }

    fn len(&self) -> usize {
        self.scores.len()
    }

    fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

///
/// MemoryStore
///
/// In-process score-ordered set store. Empty sets are dropped, so a key
/// exists only while it has members.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: RwLock<HashMap<String, SortedEntries>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that currently hold at least one member, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sets.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// All `(member, score)` pairs of `key` in ascending order.
    #[must_use]
    pub fn entries(&self, key: &str) -> Vec<(String, f64)> {
        self.sets.read().get(key).map_or_else(Vec::new, |set| {
            set.ordered
                .iter()
                .map(|(score, member)| (member.clone(), score.into_inner()))
                .collect()
        })
    }

    pub fn clear(&self) {
        self.sets.write().clear();
    }
}

impl SortedSetStore for MemoryStore {
    fn add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        if score.is_nan() {
            return Err(StoreError::Transport {
                message: format!("score for '{member}' in '{key}' is not a valid float"),
            });
        }

        self.sets
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(member, OrderedFloat(score));

        Ok(())
    }

    fn remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut sets = self.sets.write();

        if let Some(set) = sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                sets.remove(key);
            }
        }

        Ok(())
    }

    fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        Ok(self
            .sets
            .read()
            .get(key)
            .and_then(|set| set.scores.get(member))
            .map(|score| score.into_inner()))
    }

    fn rank_of(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError> {
        Ok(self.sets.read().get(key).and_then(|set| set.rank(member)))
    }

    fn cardinality(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.sets.read().get(key).map_or(0, SortedEntries::len))
    }

    fn count_in_range(&self, key: &str, range: ScoreRange) -> Result<usize, StoreError> {
        let sets = self.sets.read();

        Ok(sets
            .get(key)
            .and_then(|set| set.in_range(range))
            .map_or(0, Iterator::count))
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    fn range_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let sets = self.sets.read();
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };

        let len = set.len() as i64;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        Ok(set
            .ordered
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(_, member)| member.clone())
            .collect())
    }

    fn range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        window: Window,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError> {
        let sets = self.sets.read();
        let Some(entries) = sets.get(key).and_then(|set| set.in_range(range)) else {
            return Ok(Vec::new());
        };

        let take = window.count.unwrap_or(usize::MAX);
        let members = match direction {
            Direction::Asc => entries
                .skip(window.offset)
                .take(take)
                .map(|(_, member)| member.clone())
                .collect(),
            Direction::Desc => entries
                .rev()
                .skip(window.offset)
                .take(take)
                .map(|(_, member)| member.clone())
                .collect(),
        };

        Ok(members)
    }
}
