//! Module: db
//! Responsibility: sorted index runtime bound to one model namespace.
//! Does not own: the host's records, lifecycle firing, or store connections.
//! Boundary: hosts build one `SortedIndexes` per model type during setup.

pub mod context;
pub mod key;
pub mod lifecycle;
pub mod maintain;
pub mod query;
pub mod record;
pub mod registry;
pub mod store;

pub use context::{CallContext, CancelHandle};
pub use key::{GroupSelector, IndexKey};
pub use maintain::Maintainer;
pub use query::{Slice, SortedIter, SortedQuery, SortedSet};
pub use registry::IndexRegistry;

use crate::{
    config::IndexConfig,
    db::{record::RecordLayer, store::SortedSetStore},
    error::InternalError,
    model::index::IndexOptions,
    obs::{MetricsEvent, MetricsSink, NoopSink},
};
use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::Arc};

///
/// SortedIndexes
///
/// Registry, store, record layer and policy for one model namespace.
/// The registry is frozen at construction and shared read-only.
///

pub struct SortedIndexes<S, L> {
    registry: Arc<IndexRegistry>,
    store: S,
    layer: L,
    config: IndexConfig,
    metrics: Arc<dyn MetricsSink>,

    // old-group keys pruned in before_update, awaiting after_update
    pruned: Mutex<HashMap<String, Vec<IndexKey>>>,
}

impl<S, L> SortedIndexes<S, L>
where
    S: SortedSetStore,
    L: RecordLayer,
{
    #[must_use]
    pub fn new(registry: Arc<IndexRegistry>, store: S, layer: L) -> Self {
        Self {
            registry,
            store,
            layer,
            config: IndexConfig::default(),
            metrics: Arc::new(NoopSink),
            pruned: Mutex::new(HashMap::new()),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.registry.namespace()
    }

    #[must_use]
    pub fn registry(&self) -> &IndexRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn layer(&self) -> &L {
        &self.layer
    }

    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    pub(crate) fn record(&self, event: MetricsEvent) {
        self.metrics.record(event);
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Physical key of the index addressed by `attribute` and `selector`.
    pub fn sorted_index_key(
        &self,
        attribute: &str,
        selector: &GroupSelector,
    ) -> Result<IndexKey, InternalError> {
        IndexKey::build(self.namespace(), attribute, selector)
    }

    /// Open the sorted view of a registered index.
    ///
    /// Fails with `IndexNotFound` for unregistered `(attribute, group)`
    /// pairs, before any store call.
    pub fn sorted_find(
        &self,
        attribute: &str,
        selector: &GroupSelector,
    ) -> Result<SortedSet<'_, S, L>, InternalError> {
        let definition = self.registry.lookup(attribute, selector)?;
        let key = self.sorted_index_key(definition.attribute, selector)?;

        Ok(SortedSet::new(self, SortedQuery::new(key)))
    }

    /// Maintenance protocol for this namespace.
    #[must_use]
    pub const fn maintainer(&self) -> Maintainer<'_, S, L> {
        Maintainer::new(self)
    }

    pub(crate) fn remember_pruned(&self, id: &str, keys: Vec<IndexKey>) {
        let mut pruned = self.pruned.lock();
        if keys.is_empty() {
            pruned.remove(id);
        } else {
            pruned.insert(id.to_string(), keys);
        }
    }

    pub(crate) fn take_pruned(&self, id: &str) -> Vec<IndexKey> {
        self.pruned.lock().remove(id).unwrap_or_default()
    }
}

impl<S, L> fmt::Debug for SortedIndexes<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortedIndexes")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

///
/// SortedIndexesBuilder
///
/// Type-setup helper: declares definitions, then freezes them.
/// Store and record layer types are fixed only at `build`.
///

pub struct SortedIndexesBuilder {
    registry: IndexRegistry,
    config: IndexConfig,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl SortedIndexesBuilder {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            registry: IndexRegistry::new(namespace),
            config: IndexConfig::default(),
            metrics: None,
        }
    }

    #[must_use]
    pub fn register(mut self, attribute: &'static str, options: IndexOptions) -> Self {
        self.registry.register(attribute, options);
        self
    }

    #[must_use]
    pub fn sorted(mut self, attribute: &'static str) -> Self {
        self.registry.sorted(attribute);
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, attribute: &'static str, group_by: &'static str) -> Self {
        self.registry.sorted_by(attribute, group_by);
        self
    }

    #[must_use]
    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn build<S, L>(self, store: S, layer: L) -> SortedIndexes<S, L>
    where
        S: SortedSetStore,
        L: RecordLayer,
    {
        let mut indexes = SortedIndexes::new(Arc::new(self.registry), store, layer);
        indexes.config = self.config;
        if let Some(metrics) = self.metrics {
            indexes.metrics = metrics;
        }

        indexes
    }
}
