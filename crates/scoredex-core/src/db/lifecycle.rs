//! Module: db::lifecycle
//! Responsibility: explicit, ordered observer list for record lifecycle hooks.
//! Does not own: when the host fires a hook, or what the host does on failure
//! beyond stopping the chain.
//! Boundary: the host record layer calls `dispatch` at its extension points.

use crate::{
    db::{context::CallContext, record::RecordState},
    error::InternalError,
};
use std::fmt;

///
/// LifecycleHook
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LifecycleHook {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BeforeCreate => "before_create",
            Self::AfterCreate => "after_create",
            Self::BeforeUpdate => "before_update",
            Self::AfterUpdate => "after_update",
            Self::BeforeDelete => "before_delete",
            Self::AfterDelete => "after_delete",
        };
        write!(f, "{label}")
    }
}

///
/// LifecycleEvent
///

#[derive(Debug)]
pub struct LifecycleEvent<'a, R> {
    pub hook: LifecycleHook,
    pub state: RecordState,
    pub record: &'a R,
    pub ctx: &'a CallContext,
}

///
/// LifecycleObserver
///
/// One participant in the lifecycle chain. Only hooks listed by `hooks`
/// are delivered.
///

pub trait LifecycleObserver<R> {
    fn name(&self) -> &'static str;

    fn hooks(&self) -> &'static [LifecycleHook];

    fn on_event(&self, event: &LifecycleEvent<'_, R>) -> Result<(), InternalError>;
}

///
/// ObserverChain
///
/// Observers in registration order. Dispatch stops at the first error and
/// returns it; the host must then abort the mutation.
///

pub struct ObserverChain<'a, R> {
    observers: Vec<Box<dyn LifecycleObserver<R> + 'a>>,
}

impl<'a, R> ObserverChain<'a, R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: impl LifecycleObserver<R> + 'a) -> &mut Self {
        self.observers.push(Box::new(observer));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Number of observers subscribed to `hook`.
    #[must_use]
    pub fn subscribers(&self, hook: LifecycleHook) -> usize {
        self.observers
            .iter()
            .filter(|observer| observer.hooks().contains(&hook))
            .count()
    }

    pub fn dispatch(
        &self,
        hook: LifecycleHook,
        state: RecordState,
        record: &R,
        ctx: &CallContext,
    ) -> Result<(), InternalError> {
        let event = LifecycleEvent {
            hook,
            state,
            record,
            ctx,
        };

        for observer in &self.observers {
            if !observer.hooks().contains(&hook) {
                continue;
            }

            tracing::trace!(observer = observer.name(), %hook, "lifecycle dispatch");
            observer.on_event(&event)?;
        }

        Ok(())
    }
}

impl<R> Default for ObserverChain<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ObserverChain<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|observer| observer.name()))
            .finish()
    }
}
