use crate::db::record::ReadConsistency;
use serde::{Deserialize, Serialize};

///
/// MissingAttributePolicy
///
/// How maintenance scores a record whose sort attribute is absent.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttributePolicy {
    /// Index the record with score `0.0`.
    #[default]
    Zero,

    /// Keep the record out of that index (removing any stale membership).
    Skip,

    /// Reject the mutation with an invalid-argument error before any store call.
    Fail,
}

///
/// IndexConfig
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub missing_attribute: MissingAttributePolicy,
    pub read_consistency: ReadConsistency,
}

impl IndexConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            missing_attribute: MissingAttributePolicy::Zero,
            read_consistency: ReadConsistency::MissingOk,
        }
    }

    #[must_use]
    pub const fn with_missing_attribute(mut self, policy: MissingAttributePolicy) -> Self {
        self.missing_attribute = policy;
        self
    }

    #[must_use]
    pub const fn with_read_consistency(mut self, consistency: ReadConsistency) -> Self {
        self.read_consistency = consistency;
        self
    }
}
