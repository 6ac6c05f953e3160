//! In-crate fixtures: a record layer fake, a host that fires lifecycle
//! hooks, and a store wrapper with switchable failures.

use crate::{
    config::IndexConfig,
    db::{
        CallContext, SortedIndexes, SortedIndexesBuilder,
        lifecycle::{LifecycleHook, ObserverChain},
        record::{Record, RecordLayer, RecordState},
        store::{Direction, MemoryStore, ScoreRange, SortedSetStore, StoreError, Window},
    },
    error::InternalError,
    obs::EventCounters,
    value::Value,
};
use parking_lot::{Mutex, RwLock};
use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

pub(crate) const POST: &str = "Post";

///
/// TestRecord
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TestRecord {
    pub id: String,
    pub values: BTreeMap<String, Value>,
}

impl TestRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, attribute: &str, value: impl Into<Value>) -> Self {
        self.values.insert(attribute.to_string(), value.into());
        self
    }

    pub fn set(&mut self, attribute: &str, value: impl Into<Value>) {
        self.values.insert(attribute.to_string(), value.into());
    }
}

impl Record for TestRecord {
    fn id(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.id)
    }

    fn value(&self, attribute: &str) -> Value {
        self.values.get(attribute).cloned().unwrap_or_default()
    }
}

/// A post in `status` with sort attribute `order`.
pub(crate) fn post(id: &str, status: &str, order: i64) -> TestRecord {
    TestRecord::new(id).with("status", status).with("order", order)
}

///
/// MemoryRecords
///
/// Persisted rows keyed by id; `persisted_value` reads the stored row,
/// not the pending record handed to the hooks.
///

#[derive(Debug, Default)]
pub(crate) struct MemoryRecords {
    rows: RwLock<HashMap<String, TestRecord>>,
    fail_reads: AtomicBool,
    // reads allowed before `persisted_value` starts failing
    read_budget: Mutex<Option<usize>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persist(&self, record: &TestRecord) {
        self.rows.write().insert(record.id.clone(), record.clone());
    }

    pub fn forget(&self, id: &str) {
        self.rows.write().remove(id);
    }

    pub fn get(&self, id: &str) -> Option<TestRecord> {
        self.rows.read().get(id).cloned()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Let `reads` more `persisted_value` calls succeed, then fail.
    pub fn fail_reads_after(&self, reads: usize) {
        *self.read_budget.lock() = Some(reads);
    }

    fn spend_read(&self) -> bool {
        match self.read_budget.lock().as_mut() {
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
            None => true,
        }
    }
}

impl RecordLayer for MemoryRecords {
    type Record = TestRecord;

    fn resolve(&self, _: &str, id: &str) -> Result<Option<TestRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "record layer down".to_string(),
            });
        }

        Ok(self.get(id))
    }

    fn persisted_value(
        &self,
        _: &str,
        record: &TestRecord,
        attribute: &str,
    ) -> Result<Value, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) || !self.spend_read() {
            return Err(StoreError::Unavailable {
                message: "record layer down".to_string(),
            });
        }

        Ok(self
            .rows
            .read()
            .get(&record.id)
            .map(|row| row.value(attribute))
            .unwrap_or_default())
    }
}

///
/// FaultyStore
///
/// `MemoryStore` with switchable write failures and a call counter.
///

#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    pub inner: MemoryStore,
    fail_adds: AtomicBool,
    fail_removes: AtomicBool,
    fail_reads: AtomicBool,
    calls: AtomicU64,
    log: Mutex<Vec<String>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Operations issued so far, as `op key`.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn members(&self, key: &str) -> Vec<String> {
        self.inner
            .entries(key)
            .into_iter()
            .map(|(member, _)| member)
            .collect()
    }

    fn enter(&self, op: &str, key: &str, fail: &AtomicBool) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("{op} {key}"));

        if fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: format!("{op} refused"),
            });
        }
        Ok(())
    }
}

impl SortedSetStore for FaultyStore {
    fn add(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        self.enter("add", key, &self.fail_adds)?;
        self.inner.add(key, score, member)
    }

    fn remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.enter("remove", key, &self.fail_removes)?;
        self.inner.remove(key, member)
    }

    fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        self.enter("score_of", key, &self.fail_reads)?;
        self.inner.score_of(key, member)
    }

    fn rank_of(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError> {
        self.enter("rank_of", key, &self.fail_reads)?;
        self.inner.rank_of(key, member)
    }

    fn cardinality(&self, key: &str) -> Result<usize, StoreError> {
        self.enter("cardinality", key, &self.fail_reads)?;
        self.inner.cardinality(key)
    }

    fn count_in_range(&self, key: &str, range: ScoreRange) -> Result<usize, StoreError> {
        self.enter("count_in_range", key, &self.fail_reads)?;
        self.inner.count_in_range(key, range)
    }

    fn range_by_rank(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.enter("range_by_rank", key, &self.fail_reads)?;
        self.inner.range_by_rank(key, start, stop)
    }

    fn range_by_score(
        &self,
        key: &str,
        range: ScoreRange,
        window: Window,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError> {
        self.enter("range_by_score", key, &self.fail_reads)?;
        self.inner.range_by_score(key, range, window, direction)
    }
}

pub(crate) type TestIndexes<'a> = SortedIndexes<&'a FaultyStore, &'a MemoryRecords>;

/// `Post` with `sorted :order, group_by: :status` and `sorted :order`.
pub(crate) fn post_indexes<'a>(
    store: &'a FaultyStore,
    records: &'a MemoryRecords,
    config: IndexConfig,
    metrics: Arc<EventCounters>,
) -> TestIndexes<'a> {
    SortedIndexesBuilder::new(POST)
        .sorted_by("order", "status")
        .sorted("order")
        .config(config)
        .metrics(metrics)
        .build(store, records)
}

///
/// TestHost
///
/// Minimal host record layer: persists rows and fires the lifecycle
/// chain around each mutation, aborting on the first hook error.
///

pub(crate) struct TestHost<'a> {
    records: &'a MemoryRecords,
    chain: ObserverChain<'a, TestRecord>,
    ctx: CallContext,
}

impl<'a> TestHost<'a> {
    pub fn new(indexes: &'a TestIndexes<'a>, records: &'a MemoryRecords) -> Self {
        let mut chain = ObserverChain::new();
        chain.register(indexes.maintainer());

        Self {
            records,
            chain,
            ctx: CallContext::background(),
        }
    }

    pub fn with_context(mut self, ctx: CallContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn create(&self, record: &TestRecord) -> Result<(), InternalError> {
        self.fire(LifecycleHook::BeforeCreate, RecordState::New, record)?;
        self.records.persist(record);
        self.fire(LifecycleHook::AfterCreate, RecordState::Persisted, record)
    }

    /// Apply `changes` to the stored row and save it.
    pub fn update(&self, id: &str, changes: &[(&str, Value)]) -> Result<TestRecord, InternalError> {
        let mut pending = self.records.get(id).expect("update of a stored record");
        for (attribute, value) in changes {
            pending.set(attribute, value.clone());
        }

        self.fire(LifecycleHook::BeforeUpdate, RecordState::Persisted, &pending)?;
        self.records.persist(&pending);
        self.fire(LifecycleHook::AfterUpdate, RecordState::Persisted, &pending)?;

        Ok(pending)
    }

    pub fn delete(&self, id: &str) -> Result<(), InternalError> {
        let record = self.records.get(id).expect("delete of a stored record");

        self.fire(LifecycleHook::BeforeDelete, RecordState::Persisted, &record)?;
        self.records.forget(id);
        self.fire(LifecycleHook::AfterDelete, RecordState::Persisted, &record)
    }

    fn fire(
        &self,
        hook: LifecycleHook,
        state: RecordState,
        record: &TestRecord,
    ) -> Result<(), InternalError> {
        self.chain.dispatch(hook, state, record, &self.ctx)
    }
}
