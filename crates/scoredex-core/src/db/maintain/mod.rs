//! Module: db::maintain
//! Responsibility: keep sorted-set membership in step with record lifecycle.
//! Does not own: hook firing, retries, or cross-key atomicity.
//! Boundary: called through `LifecycleObserver` or directly by the host.
//!
//! Group migration is two single-key calls, prune (before update) then
//! install (after update), with no transaction around them. A failure or
//! crash between the two leaves the record out of both group sets until the
//! next successful update.


use crate::{
    config::MissingAttributePolicy,
    db::{
        SortedIndexes,
        context::CallContext,
        key::{GroupSelector, IndexKey},
        lifecycle::{LifecycleEvent, LifecycleHook, LifecycleObserver},
        record::{Record, RecordLayer, RecordState},
        store::SortedSetStore,
    },
    error::{ErrorOrigin, InternalError, MaintenanceError, MaintenancePhase},
    model::index::IndexDefinition,
    obs::MetricsEvent,
};

/// Hooks the maintainer subscribes to.
const MAINTAINED_HOOKS: &[LifecycleHook] = &[
    LifecycleHook::AfterCreate,
    LifecycleHook::BeforeUpdate,
    LifecycleHook::AfterUpdate,
    LifecycleHook::BeforeDelete,
];

///
/// IndexTarget
///
/// Where one definition wants the record: a key, and the score to store
/// there (`None` keeps the record out of that key).
///

#[derive(Debug)]
struct IndexTarget {
    key: IndexKey,
    score: Option<f64>,
}

///
/// Maintainer
///
/// Stateless view over a `SortedIndexes`; pruned keys awaiting the after
/// phase are remembered by the `SortedIndexes` itself.
///

pub struct Maintainer<'a, S, L> {
    indexes: &'a SortedIndexes<S, L>,
}

impl<'a, S, L> Maintainer<'a, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    pub(crate) const fn new(indexes: &'a SortedIndexes<S, L>) -> Self {
        Self { indexes }
    }

    // ------------------------------------------------------------------
    // Hook entry points
    // ------------------------------------------------------------------

    pub fn after_create(&self, record: &L::Record, ctx: &CallContext) -> Result<(), InternalError> {
        self.add_sorted_indices(record, ctx)
    }

    pub fn before_update(
        &self,
        record: &L::Record,
        state: RecordState,
        ctx: &CallContext,
    ) -> Result<(), InternalError> {
        self.prune_sorted_indices(record, state, ctx).map(|_| ())
    }

    pub fn after_update(
        &self,
        record: &L::Record,
        state: RecordState,
        ctx: &CallContext,
    ) -> Result<(), InternalError> {
        if state.is_new() {
            return Ok(());
        }

        self.add_sorted_indices(record, ctx)
    }

    pub fn before_delete(&self, record: &L::Record, ctx: &CallContext) -> Result<(), InternalError> {
        self.remove_sorted_indices(record, ctx)
    }

    /// Prune then install for a persisted record, as one call.
    pub fn apply_update(&self, record: &L::Record, ctx: &CallContext) -> Result<(), InternalError> {
        self.before_update(record, RecordState::Persisted, ctx)?;
        self.after_update(record, RecordState::Persisted, ctx)
    }

    // ------------------------------------------------------------------
    // Protocol
    // ------------------------------------------------------------------

    /// Install current membership and score for every definition.
    pub fn add_sorted_indices(
        &self,
        record: &L::Record,
        ctx: &CallContext,
    ) -> Result<(), InternalError> {
        let id = record.id();

        // Phase 1: derive every target before touching the store.
        let targets = match self
            .indexes
            .registry()
            .definitions()
            .iter()
            .map(|definition| self.target(definition, record, &id))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(targets) => targets,
            Err(err) => return Err(self.abandon_install(&id, err)),
        };

        // Phase 2: apply in declaration order.
        let mut applied = Vec::with_capacity(targets.len());
        for target in targets {
            if let Err(err) = ctx.check("sorted index install") {
                return Err(self.abandon_install(&id, err));
            }

            let result = match target.score {
                Some(score) => self.indexes.store().add(&target.key, score, &id),
                None => self.indexes.store().remove(&target.key, &id),
            };

            if let Err(source) = result {
                let err = MaintenanceError {
                    phase: MaintenancePhase::Install,
                    namespace: self.indexes.namespace().to_string(),
                    id: id.to_string(),
                    key: target.key,
                    pruned: self.indexes.take_pruned(&id),
                    applied,
                    source,
                };
                return Err(self.failed(err));
            }

            match target.score {
                Some(score) => {
                    tracing::debug!(key = %target.key, id = %id, score, "sorted index add");
                    self.indexes.record(MetricsEvent::IndexAdd);
                }
                None => {
                    tracing::debug!(key = %target.key, id = %id, "sorted index skip (attribute missing)");
                    self.indexes.record(MetricsEvent::IndexRemove);
                }
            }
            applied.push(target.key);
        }

        self.indexes.take_pruned(&id);

        Ok(())
    }

    /// Remove stale group membership ahead of an update.
    ///
    /// Returns the old-group keys the record was removed from. New records
    /// have nothing persisted and are skipped.
    pub fn prune_sorted_indices(
        &self,
        record: &L::Record,
        state: RecordState,
        ctx: &CallContext,
    ) -> Result<Vec<IndexKey>, InternalError> {
        if state.is_new() {
            return Ok(Vec::new());
        }

        let id = record.id();
        let namespace = self.indexes.namespace();

        // A record the after phase cannot install is rejected here, before
        // any old-group key is removed.
        for definition in self.indexes.registry().definitions() {
            if self.score(definition, record, &id)?.is_none() {
                self.missing(definition, &id)?;
            }
        }

        let mut pruned = Vec::new();
        for definition in self.indexes.registry().definitions() {
            let Some(group_by) = definition.group_by() else {
                continue;
            };

            if let Err(err) = ctx.check("sorted index prune") {
                return Err(self.abandon_prune(&id, pruned, err));
            }
            let old_value = match self
                .indexes
                .layer()
                .persisted_value(namespace, record, group_by)
            {
                Ok(value) => value,
                Err(err) => {
                    let err = InternalError::store(ErrorOrigin::Resolve, err);
                    return Err(self.abandon_prune(&id, pruned, err));
                }
            };
            let new_value = record.value(group_by);

            if old_value.to_segment() == new_value.to_segment() {
                continue;
            }

            let old_key = match IndexKey::build(
                namespace,
                definition.attribute,
                &GroupSelector::by(group_by, old_value.clone()),
            ) {
                Ok(key) => key,
                Err(err) => return Err(self.abandon_prune(&id, pruned, err)),
            };

            if let Err(err) = ctx.check("sorted index prune") {
                return Err(self.abandon_prune(&id, pruned, err));
            }
            if let Err(source) = self.indexes.store().remove(&old_key, &id) {
                self.indexes.take_pruned(&id);
                let err = MaintenanceError {
                    phase: MaintenancePhase::Prune,
                    namespace: namespace.to_string(),
                    id: id.to_string(),
                    key: old_key,
                    pruned,
                    applied: Vec::new(),
                    source,
                };
                return Err(self.failed(err));
            }

            tracing::debug!(
                key = %old_key,
                id = %id,
                from = %old_value,
                to = %new_value,
                "sorted index group migration"
            );
            self.indexes.record(MetricsEvent::GroupMigration);
            self.indexes.record(MetricsEvent::IndexRemove);
            pruned.push(old_key);
        }

        self.indexes.remember_pruned(&id, pruned.clone());

        Ok(pruned)
    }

    /// Remove the record from every definition's current key.
    pub fn remove_sorted_indices(
        &self,
        record: &L::Record,
        ctx: &CallContext,
    ) -> Result<(), InternalError> {
        let id = record.id();
        let mut removed = Vec::new();

        for definition in self.indexes.registry().definitions() {
            let key = self.current_key(definition, record)?;

            ctx.check("sorted index remove")?;
            if let Err(source) = self.indexes.store().remove(&key, &id) {
                let err = MaintenanceError {
                    phase: MaintenancePhase::Remove,
                    namespace: self.indexes.namespace().to_string(),
                    id: id.to_string(),
                    key,
                    pruned: Vec::new(),
                    applied: removed,
                    source,
                };
                return Err(self.failed(err));
            }

            tracing::debug!(key = %key, id = %id, "sorted index remove");
            self.indexes.record(MetricsEvent::IndexRemove);
            removed.push(key);
        }

        self.indexes.take_pruned(&id);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn current_key(
        &self,
        definition: &IndexDefinition,
        record: &L::Record,
    ) -> Result<IndexKey, InternalError> {
        let selector = match definition.group_by() {
            Some(group_by) => GroupSelector::by(group_by, record.value(group_by)),
            None => GroupSelector::none(),
        };

        IndexKey::build(self.indexes.namespace(), definition.attribute, &selector)
    }

    fn target(
        &self,
        definition: &IndexDefinition,
        record: &L::Record,
        id: &str,
    ) -> Result<IndexTarget, InternalError> {
        let key = self.current_key(definition, record)?;
        let score = match self.score(definition, record, id)? {
            Some(score) => Some(score),
            None => {
                self.indexes.record(MetricsEvent::MissingAttribute);
                self.missing(definition, id)?
            }
        };

        Ok(IndexTarget { key, score })
    }

    /// Raw score of the sorted attribute; `None` when it is absent.
    fn score(
        &self,
        definition: &IndexDefinition,
        record: &L::Record,
        id: &str,
    ) -> Result<Option<f64>, InternalError> {
        record.value(definition.attribute).to_score().map_err(|err| {
            InternalError::maintain_invalid(format!(
                "cannot score {}:{id} on '{}': {err}",
                self.indexes.namespace(),
                definition.attribute
            ))
        })
    }

    /// Score to store for a record missing the sorted attribute.
    fn missing(&self, definition: &IndexDefinition, id: &str) -> Result<Option<f64>, InternalError> {
        match self.indexes.config().missing_attribute {
            MissingAttributePolicy::Zero => Ok(Some(0.0)),
            MissingAttributePolicy::Skip => Ok(None),
            MissingAttributePolicy::Fail => Err(InternalError::maintain_invalid(format!(
                "{}:{id} has no value for sorted attribute '{}'",
                self.indexes.namespace(),
                definition.attribute
            ))),
        }
    }

    fn failed(&self, err: MaintenanceError) -> InternalError {
        if !err.pruned.is_empty() {
            tracing::warn!(
                id = %err.id,
                key = %err.key,
                phase = %err.phase,
                pruned = err.pruned.len(),
                "sorted index maintenance failed after prune"
            );
        }
        self.indexes.record(MetricsEvent::MaintenanceFailed { phase: err.phase });

        err.into()
    }

    fn abandon_install(&self, id: &str, err: InternalError) -> InternalError {
        let pruned = self.indexes.take_pruned(id);

        Self::abandon(id, MaintenancePhase::Install, pruned, err)
    }

    fn abandon_prune(&self, id: &str, pruned: Vec<IndexKey>, err: InternalError) -> InternalError {
        self.indexes.take_pruned(id);

        Self::abandon(id, MaintenancePhase::Prune, pruned, err)
    }

    fn abandon(
        id: &str,
        phase: MaintenancePhase,
        pruned: Vec<IndexKey>,
        err: InternalError,
    ) -> InternalError {
        if pruned.is_empty() {
            return err;
        }

        tracing::warn!(
            id,
            phase = %phase,
            pruned = pruned.len(),
            error = %err,
            "sorted index maintenance abandoned after prune"
        );

        err.after_prune(pruned)
    }
}

impl<S, L> LifecycleObserver<L::Record> for Maintainer<'_, S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    fn name(&self) -> &'static str {
        "sorted_indices"
    }

    fn hooks(&self) -> &'static [LifecycleHook] {
        MAINTAINED_HOOKS
    }

    fn on_event(&self, event: &LifecycleEvent<'_, L::Record>) -> Result<(), InternalError> {
        match event.hook {
            LifecycleHook::AfterCreate => self.after_create(event.record, event.ctx),
            LifecycleHook::BeforeUpdate => self.before_update(event.record, event.state, event.ctx),
            LifecycleHook::AfterUpdate => self.after_update(event.record, event.state, event.ctx),
            LifecycleHook::BeforeDelete => self.before_delete(event.record, event.ctx),
            LifecycleHook::BeforeCreate | LifecycleHook::AfterDelete => Ok(()),
        }
    }
}
