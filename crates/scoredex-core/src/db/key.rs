//! Module: db::key
//! Responsibility: derive the physical score-ordered set key for a definition.
//! Does not own: definition lookup or store access.

use crate::{error::InternalError, value::Value};
use derive_more::{Deref, Display};
use serde::{Deserialize, Serialize};

///
/// CONSTANTS
///

/// Separator between key segments.
pub const KEY_SEPARATOR: &str = ":";

/// Fixed segment marking sorted-index keys within a namespace.
pub const SORTED_SEGMENT: &str = "sorted";

///
/// IndexKey
///
/// `{namespace}:sorted:{attribute}[:{group_attribute}:{group_value}]`
///

#[derive(
    Clone, Debug, Deref, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[deref(forward)]
pub struct IndexKey(String);

impl IndexKey {
    /// Build the key for `attribute`, partitioned by at most one group pair.
    pub fn build(
        namespace: &str,
        attribute: &str,
        selector: &GroupSelector,
    ) -> Result<Self, InternalError> {
        let mut key = [namespace, SORTED_SEGMENT, attribute].join(KEY_SEPARATOR);

        match selector.pairs() {
            [] => {}
            [(group_attribute, value)] => {
                key.push_str(KEY_SEPARATOR);
                key.push_str(group_attribute);
                key.push_str(KEY_SEPARATOR);
                key.push_str(&value.to_segment());
            }
            pairs => {
                return Err(InternalError::key_invalid(format!(
                    "sorted index key for {namespace}:{attribute} accepts at most one group attribute, got {}",
                    pairs.len()
                )));
            }
        }

        Ok(Self(key))
    }

    /// Wrap an already-built key without validation.
    #[must_use]
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for IndexKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

///
/// GroupSelector
///
/// Ordered `(group attribute, value)` pairs naming one partition.
/// Only zero or one pair is meaningful; more is rejected where used.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupSelector(Vec<(String, Value)>);

impl GroupSelector {
    /// Selector for an ungrouped index.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    /// Selector for the partition where `attribute == value`.
    #[must_use]
    pub fn by(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self(vec![(attribute.into(), value.into())])
    }

    /// Append another pair.
    #[must_use]
    pub fn and(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.push((attribute.into(), value.into()));
        self
    }

    #[must_use]
    pub fn pairs(&self) -> &[(String, Value)] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single group attribute named by this selector.
    pub fn group_attribute(&self) -> Result<Option<&str>, InternalError> {
        match self.0.as_slice() {
            [] => Ok(None),
            [(attribute, _)] => Ok(Some(attribute.as_str())),
            pairs => Err(InternalError::key_invalid(format!(
                "group selector names {} attributes, only one is supported",
                pairs.len()
            ))),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for GroupSelector
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
