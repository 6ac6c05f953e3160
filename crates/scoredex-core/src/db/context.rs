//! Module: db::context
//! Responsibility: deadline and cancellation carried into maintenance calls.
//! Does not own: retries or interrupting a store call already issued.
//! Boundary: checked by the maintainer before each store call.

use crate::error::InternalError;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

///
/// CallContext
///
/// Caller-supplied deadline and cancellation for a maintenance sequence.
/// Checked before every store call; a call already issued always runs to
/// completion and its result is surfaced.
///

#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl CallContext {
    /// No deadline, not cancellable.
    #[must_use]
    pub const fn background() -> Self {
        Self {
            deadline: None,
            cancelled: None,
        }
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation flag and return the handle that trips it.
    #[must_use]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancelled = Some(Arc::clone(&flag));

        (self, CancelHandle(flag))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail if the next store call must not be issued.
    pub fn check(&self, operation: &str) -> Result<(), InternalError> {
        if self.is_cancelled() {
            return Err(InternalError::cancelled(format!(
                "{operation} cancelled before store call"
            )));
        }
        if self.is_expired() {
            return Err(InternalError::cancelled(format!(
                "{operation} deadline elapsed before store call"
            )));
        }

        Ok(())
    }
}

///
/// CancelHandle
///

#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}
