use crate::db::{IndexKey, store::StoreError};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Store failures are carried unchanged in `detail`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    #[must_use]
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct the error raised when no sorted index matches a lookup.
    pub fn index_not_found(attribute: impl Into<String>, group_by: Option<String>) -> Self {
        let attribute = attribute.into();
        let message = match &group_by {
            Some(group_by) => format!("sorted index not found: {attribute} (group by {group_by})"),
            None => format!("sorted index not found: {attribute}"),
        };

        Self {
            class: ErrorClass::NotFound,
            origin: ErrorOrigin::Registry,
            message,
            detail: Some(ErrorDetail::IndexNotFound {
                attribute,
                group_by,
            }),
        }
    }

    /// Construct a key-origin invalid argument error.
    pub(crate) fn key_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Key, message)
    }

    /// Construct a query-origin invalid argument error.
    pub(crate) fn query_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Query, message)
    }

    /// Construct a maintain-origin invalid argument error.
    pub(crate) fn maintain_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Maintain, message)
    }

    /// Construct a resolve-origin invariant violation (strict reads).
    pub(crate) fn resolve_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Resolve, message)
    }

    /// Wrap a store error raised from `origin`, keeping it as detail.
    pub(crate) fn store(origin: ErrorOrigin, err: StoreError) -> Self {
        Self {
            class: err.class(),
            origin,
            message: err.to_string(),
            detail: Some(ErrorDetail::Store(err)),
        }
    }

    /// Construct a cancellation error for a maintenance call that never ran.
    pub(crate) fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Cancelled, ErrorOrigin::Maintain, message)
    }

    /// Name old-group keys already pruned when maintenance stopped.
    ///
    /// Class and origin are kept; the original detail moves into the
    /// `Abandoned` cause.
    #[must_use]
    pub(crate) fn after_prune(self, pruned: Vec<IndexKey>) -> Self {
        let keys = pruned
            .iter()
            .map(IndexKey::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            class: self.class,
            origin: self.origin,
            message: format!("{}; already pruned from: {keys}", self.message),
            detail: Some(ErrorDetail::Abandoned {
                pruned,
                cause: self.detail.map(Box::new),
            }),
        }
    }

    #[must_use]
    pub const fn is_index_not_found(&self) -> bool {
        matches!(self.detail, Some(ErrorDetail::IndexNotFound { .. }))
    }

    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidArgument)
    }

    /// Whether the failure came from a transient store condition.
    ///
    /// The maintainer never retries on its own; this is for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_transient)
    }

    /// Return the store error carried by this error, if any.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        self.detail.as_ref().and_then(ErrorDetail::store_error)
    }

    /// Old-group keys this record was already pruned from when the
    /// failing call stopped. Empty when nothing was left half-done.
    #[must_use]
    pub fn pruned_keys(&self) -> &[IndexKey] {
        match &self.detail {
            Some(ErrorDetail::Maintenance(err)) => &err.pruned,
            Some(ErrorDetail::Abandoned { pruned, .. }) => pruned,
            _ => &[],
        }
    }

    /// Return the partial-maintenance context, if this is one.
    #[must_use]
    pub const fn maintenance(&self) -> Option<&MaintenanceError> {
        match &self.detail {
            Some(ErrorDetail::Maintenance(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<MaintenanceError> for InternalError {
    fn from(err: MaintenanceError) -> Self {
        let class = match err.phase {
            MaintenancePhase::Install if !err.pruned.is_empty() || !err.applied.is_empty() => {
                ErrorClass::PartialApply
            }
            _ => err.source.class(),
        };

        Self {
            class,
            origin: ErrorOrigin::Maintain,
            message: err.to_string(),
            detail: Some(ErrorDetail::Maintenance(err)),
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Store(StoreError),

    #[error("{0}")]
    Maintenance(MaintenanceError),

    #[error("index not found: {attribute}")]
    IndexNotFound {
        attribute: String,
        group_by: Option<String>,
    },

    /// Maintenance stopped without a store failure of its own (cancelled,
    /// unreadable persisted value) after `pruned` keys were removed.
    #[error("abandoned after pruning {} key(s)", .pruned.len())]
    Abandoned {
        pruned: Vec<IndexKey>,
        cause: Option<Box<ErrorDetail>>,
    },
}

impl ErrorDetail {
    fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            Self::Maintenance(err) => Some(&err.source),
            Self::Abandoned { cause, .. } => cause.as_deref().and_then(Self::store_error),
            Self::IndexNotFound { .. } => None,
        }
    }
}

///
/// MaintenancePhase
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MaintenancePhase {
    /// Before-update removal of stale group membership.
    Prune,
    /// After-create / after-update installation of current membership.
    Install,
    /// Before-delete removal of all membership.
    Remove,
}

impl fmt::Display for MaintenancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Prune => "prune",
            Self::Install => "install",
            Self::Remove => "remove",
        };
        write!(f, "{label}")
    }
}

///
/// MaintenanceError
///
/// A store failure in the middle of a maintenance sequence.
/// `pruned` lists old-group keys this record was already removed from,
/// `applied` the keys already written in the failing phase. Together they
/// describe exactly what is left half-done.
///

#[derive(Debug, ThisError)]
#[error(
    "sorted index {phase} failed for {namespace}:{id} at '{key}' (pruned {}, applied {}): {source}",
    .pruned.len(),
    .applied.len()
)]
pub struct MaintenanceError {
    pub phase: MaintenancePhase,
    pub namespace: String,
    pub id: String,
    pub key: IndexKey,
    pub pruned: Vec<IndexKey>,
    pub applied: Vec<IndexKey>,
    pub source: StoreError,
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    NotFound,
    InvalidArgument,
    Unavailable,
    PartialApply,
    Cancelled,
    Internal,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Unavailable => "unavailable",
            Self::PartialApply => "partial_apply",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Key,
    Registry,
    Maintain,
    Query,
    Store,
    Resolve,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Key => "key",
            Self::Registry => "registry",
            Self::Maintain => "maintain",
            Self::Query => "query",
            Self::Store => "store",
            Self::Resolve => "resolve",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
