//! Module: db::record
//! Responsibility: the host record-layer port (identity, values, resolution).
//! Does not own: attribute storage, validation, or persistence.

use crate::{db::store::StoreError, value::Value};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

///
/// Record
///
/// One host record as seen by index maintenance.
///

pub trait Record {
    /// Identifier stored as the sorted-set member.
    fn id(&self) -> Cow<'_, str>;

    /// Current (possibly pending) value of `attribute`.
    fn value(&self, attribute: &str) -> Value;
}

///
/// RecordLayer
///
/// Host-side access to persisted records.
///

pub trait RecordLayer {
    type Record: Record;

    /// Load the record stored under `id`, or `None` when it does not exist.
    fn resolve(&self, namespace: &str, id: &str) -> Result<Option<Self::Record>, StoreError>;

    /// Value of `attribute` as last persisted, before any pending change.
    fn persisted_value(
        &self,
        namespace: &str,
        record: &Self::Record,
        attribute: &str,
    ) -> Result<Value, StoreError>;
}

impl<L: RecordLayer + ?Sized> RecordLayer for &L {
    type Record = L::Record;

    fn resolve(&self, namespace: &str, id: &str) -> Result<Option<Self::Record>, StoreError> {
        (**self).resolve(namespace, id)
    }

    fn persisted_value(
        &self,
        namespace: &str,
        record: &Self::Record,
        attribute: &str,
    ) -> Result<Value, StoreError> {
        (**self).persisted_value(namespace, record, attribute)
    }
}

///
/// RecordState
///
/// Whether the record already exists in the primary store.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordState {
    New,
    Persisted,
}

impl RecordState {
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::New)
    }
}

///
/// ReadConsistency
///
/// What a query does with an index member whose record cannot be resolved.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadConsistency {
    /// Missing records are skipped (no error).
    #[default]
    MissingOk,

    /// Missing records are treated as an index invariant violation.
    Strict,
}
