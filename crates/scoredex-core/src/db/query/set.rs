//! Module: db::query::set
//! Responsibility: execute a `SortedQuery` against the store and resolve records.
//! Does not own: descriptor semantics (see `SortedQuery`).

use crate::{
    db::{
        SortedIndexes,
        key::IndexKey,
        query::SortedQuery,
        record::{ReadConsistency, Record, RecordLayer},
        store::{SortedSetStore, StoreError, Window},
    },
    error::{ErrorOrigin, InternalError},
    obs::{MetricsEvent, QueryKind},
};
use std::{fmt, iter::FusedIterator, ops::RangeInclusive, vec};

///
/// SortedSet
///
/// A `SortedQuery` bound to the indexes it reads from.
/// Builders are pure; terminal methods each issue fresh store calls.
///

pub struct SortedSet<'a, S, L> {
    indexes: &'a SortedIndexes<S, L>,
    query: SortedQuery,
}

impl<'a, S, L> SortedSet<'a, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    pub(crate) const fn new(indexes: &'a SortedIndexes<S, L>, query: SortedQuery) -> Self {
        Self { indexes, query }
    }

    #[must_use]
    pub const fn query(&self) -> &SortedQuery {
        &self.query
    }

    #[must_use]
    pub const fn key(&self) -> &IndexKey {
        self.query.key()
    }

    fn map_query(mut self, map: impl FnOnce(SortedQuery) -> SortedQuery) -> Self {
        self.query = map(self.query);
        self
    }

    // ------------------------------------------------------------------
    // View builders (pure)
    // ------------------------------------------------------------------

    #[must_use]
    pub fn between(self, low: impl Into<f64>, high: impl Into<f64>) -> Self {
        self.map_query(|query| query.between(low, high))
    }

    #[must_use]
    pub fn range<T: Into<f64> + Copy>(self, range: RangeInclusive<T>) -> Self {
        self.map_query(|query| query.range(range))
    }

    #[must_use]
    pub fn slice(self, offset: usize, count: Option<usize>) -> Self {
        self.map_query(|query| query.slice(offset, count))
    }

    #[must_use]
    pub fn offset(self, offset: usize) -> Self {
        self.map_query(|query| query.offset(offset))
    }

    #[must_use]
    pub fn limit(self, count: usize) -> Self {
        self.map_query(|query| query.limit(count))
    }

    #[must_use]
    pub fn reverse(self) -> Self {
        self.map_query(SortedQuery::reverse)
    }

    /// Host-facing slice with runtime arity.
    ///
    /// One argument selects the element at that position; two select an
    /// `(offset, count)` window where a count of `-1` is unbounded.
    pub fn slice_args(&self, args: &[i64]) -> Result<Slice<'a, S, L>, InternalError> {
        match *args {
            [index] => {
                let position = usize::try_from(index).map_err(|_| {
                    InternalError::query_invalid(format!(
                        "slice index must be non-negative, got {index}"
                    ))
                })?;

                Ok(Slice::Element(self.nth(position)?))
            }
            [offset, count] => {
                let offset = usize::try_from(offset).map_err(|_| {
                    InternalError::query_invalid(format!(
                        "slice offset must be non-negative, got {offset}"
                    ))
                })?;
                let count = match count {
                    -1 => None,
                    count => Some(usize::try_from(count).map_err(|_| {
                        InternalError::query_invalid(format!(
                            "slice count must be -1 or non-negative, got {count}"
                        ))
                    })?),
                };

                Ok(Slice::View(self.clone().slice(offset, count)))
            }
            _ => Err(InternalError::query_invalid(format!(
                "slice takes 1 or 2 arguments, got {}",
                args.len()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------

    /// Member ids of this view in iteration order, in one range call.
    pub fn ids(&self) -> Result<Vec<String>, InternalError> {
        tracing::trace!(query = %self.query, "sorted range by score");
        self.indexes.record(MetricsEvent::Query {
            kind: QueryKind::RangeByScore,
        });

        self.indexes
            .store()
            .range_by_score(
                self.key(),
                self.query.physical_range(),
                self.query.window(),
                self.query.direction(),
            )
            .map_err(query_failed)
    }

    /// Number of members in view, without fetching any of them.
    pub fn size(&self) -> Result<usize, InternalError> {
        let total = if self.query.is_ranged() {
            self.indexes.record(MetricsEvent::Query {
                kind: QueryKind::CountInRange,
            });
            self.indexes
                .store()
                .count_in_range(self.key(), self.query.physical_range())
        } else {
            self.indexes.record(MetricsEvent::Query {
                kind: QueryKind::Cardinality,
            });
            self.indexes.store().cardinality(self.key())
        }
        .map_err(query_failed)?;

        Ok(self.query.window().clamp(total))
    }

    pub fn is_empty(&self) -> Result<bool, InternalError> {
        Ok(self.size()? == 0)
    }

    /// First record of the range, ignoring any window already set.
    pub fn first(&self) -> Result<Option<L::Record>, InternalError> {
        self.clone().slice(0, Some(1)).iter().next().transpose()
    }

    /// Record at `position` within this view.
    pub fn nth(&self, position: usize) -> Result<Option<L::Record>, InternalError> {
        let window = self.query.window();
        if window.count.is_some_and(|count| position >= count) {
            return Ok(None);
        }
        let absolute = window.offset.checked_add(position).ok_or_else(|| {
            InternalError::query_invalid(format!("slice position {position} overflows"))
        })?;

        let ids = if self.query.is_ranged() {
            self.indexes.record(MetricsEvent::Query {
                kind: QueryKind::RangeByScore,
            });
            self.indexes.store().range_by_score(
                self.key(),
                self.query.physical_range(),
                Window::new(absolute, Some(1)),
                self.query.direction(),
            )
        } else {
            let rank = i64::try_from(absolute).map_err(|_| {
                InternalError::query_invalid(format!("slice position {absolute} out of range"))
            })?;
            let rank = if self.query.is_reversed() {
                -rank - 1
            } else {
                rank
            };

            self.indexes.record(MetricsEvent::Query {
                kind: QueryKind::RangeByRank,
            });
            self.indexes.store().range_by_rank(self.key(), rank, rank)
        }
        .map_err(query_failed)?;

        match ids.first() {
            Some(id) => self.resolve(id),
            None => Ok(None),
        }
    }

    /// Whether `id` is in the view's score range. The window is ignored.
    pub fn contains(&self, id: &str) -> Result<bool, InternalError> {
        self.indexes.record(MetricsEvent::Query {
            kind: QueryKind::Membership,
        });

        if self.query.is_ranged() {
            let score = self
                .indexes
                .store()
                .score_of(self.key(), id)
                .map_err(query_failed)?;

            Ok(score.is_some_and(|score| self.query.physical_range().contains(score)))
        } else {
            let rank = self
                .indexes
                .store()
                .rank_of(self.key(), id)
                .map_err(query_failed)?;

            Ok(rank.is_some())
        }
    }

    pub fn contains_record(&self, record: &L::Record) -> Result<bool, InternalError> {
        self.contains(&record.id())
    }

    /// Resolve `id` if, and only if, it is a member of this view.
    pub fn get(&self, id: &str) -> Result<Option<L::Record>, InternalError> {
        if !self.contains(id)? {
            return Ok(None);
        }

        self.resolve(id)
    }

    /// Stored score of `id` under this view's key.
    pub fn score_of(&self, id: &str) -> Result<Option<f64>, InternalError> {
        self.indexes.record(MetricsEvent::Query {
            kind: QueryKind::Membership,
        });

        self.indexes
            .store()
            .score_of(self.key(), id)
            .map_err(query_failed)
    }

    /// Lazy record iterator; nothing is fetched until the first `next`.
    #[must_use]
    pub fn iter(&self) -> SortedIter<'a, S, L> {
        SortedIter::new(self.clone())
    }

    pub fn to_vec(&self) -> Result<Vec<L::Record>, InternalError> {
        self.iter().collect()
    }

    /// Alias of `to_vec`.
    pub fn all(&self) -> Result<Vec<L::Record>, InternalError> {
        self.to_vec()
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn resolve(&self, id: &str) -> Result<Option<L::Record>, InternalError> {
        let record = self
            .indexes
            .layer()
            .resolve(self.indexes.namespace(), id)
            .map_err(|err| InternalError::store(ErrorOrigin::Resolve, err))?;

        match (record, self.indexes.config().read_consistency) {
            (Some(record), _) => Ok(Some(record)),
            (None, ReadConsistency::MissingOk) => {
                tracing::trace!(key = %self.key(), id, "skipping unresolvable index member");
                Ok(None)
            }
            (None, ReadConsistency::Strict) => Err(InternalError::resolve_invariant(format!(
                "index {} lists '{id}' but no such record exists",
                self.key()
            ))),
        }
    }
}

fn query_failed(err: StoreError) -> InternalError {
    InternalError::store(ErrorOrigin::Query, err)
}

impl<S, L> Clone for SortedSet<'_, S, L> {
    fn clone(&self) -> Self {
        Self {
            indexes: self.indexes,
            query: self.query.clone(),
        }
    }
}

impl<S, L> fmt::Debug for SortedSet<'_, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedSet")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<S, L> fmt::Display for SortedSet<'_, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SortedSet({})", self.query)
    }
}

impl<'a, S, L> IntoIterator for &SortedSet<'a, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    type Item = Result<L::Record, InternalError>;
    type IntoIter = SortedIter<'a, S, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// Slice
///
/// Result of `slice_args`: one element, or a narrower view.
///

pub enum Slice<'a, S, L>
where
    L: RecordLayer,
{
    Element(Option<L::Record>),
    View(SortedSet<'a, S, L>),
}

impl<'a, S, L> Slice<'a, S, L>
where
    L: RecordLayer,
{
    #[must_use]
    pub fn into_element(self) -> Option<L::Record> {
        match self {
            Self::Element(record) => record,
            Self::View(_) => None,
        }
    }

    #[must_use]
    pub fn into_view(self) -> Option<SortedSet<'a, S, L>> {
        match self {
            Self::View(view) => Some(view),
            Self::Element(_) => None,
        }
    }
}

///
/// SortedIter
///
/// One traversal of a view. Ids are fetched in a single range call on the
/// first `next`, then resolved one at a time. Stops after the first error.
///

pub struct SortedIter<'a, S, L> {
    set: SortedSet<'a, S, L>,
    ids: Option<vec::IntoIter<String>>,
    resolved: u64,
    missing: u64,
    done: bool,
}

impl<'a, S, L> SortedIter<'a, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    const fn new(set: SortedSet<'a, S, L>) -> Self {
        Self {
            set,
            ids: None,
            resolved: 0,
            missing: 0,
            done: false,
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.set.indexes.record(MetricsEvent::RecordsResolved {
            resolved: self.resolved,
            missing: self.missing,
        });
    }
}

impl<S, L> Iterator for SortedIter<'_, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    type Item = Result<L::Record, InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.ids.is_none() {
            match self.set.ids() {
                Ok(ids) => self.ids = Some(ids.into_iter()),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }

        while let Some(id) = self.ids.as_mut().and_then(Iterator::next) {
            match self.set.resolve(&id) {
                Ok(Some(record)) => {
                    self.resolved += 1;
                    return Some(Ok(record));
                }
                Ok(None) => self.missing += 1,
                Err(err) => {
                    self.finish();
                    return Some(Err(err));
                }
            }
        }

        self.finish();
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.ids {
            _ if self.done => (0, Some(0)),
            Some(ids) => (0, Some(ids.len())),
            None => (0, None),
        }
    }
}

impl<S, L> FusedIterator for SortedIter<'_, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
}

impl<S, L> fmt::Debug for SortedIter<'_, S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedIter")
            .field("query", &self.set.query)
            .field("started", &self.ids.is_some())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
