//! Module: db::registry
//! Responsibility: per-model table of declared sorted index definitions.
//! Does not own: key derivation or index maintenance.
//! Boundary: written during type setup, then shared read-only behind an `Arc`.

use crate::{
    db::key::GroupSelector,
    error::InternalError,
    model::index::{IndexDefinition, IndexOptions, LookupOptions},
};

///
/// IndexRegistry
///
/// Sorted index definitions declared for one model namespace, in
/// declaration order. Duplicate declarations are accepted and harmless.
///

#[derive(Clone, Debug)]
pub struct IndexRegistry {
    namespace: String,
    definitions: Vec<IndexDefinition>,
}

impl IndexRegistry {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            definitions: Vec::new(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Append a definition.
    pub fn register(&mut self, attribute: &'static str, options: IndexOptions) -> &mut Self {
        self.definitions
            .push(IndexDefinition::new(attribute, options));
        self
    }

    /// Declare an ungrouped sorted index on `attribute`.
    pub fn sorted(&mut self, attribute: &'static str) -> &mut Self {
        self.register(attribute, IndexOptions::NONE)
    }

    /// Declare a sorted index on `attribute` partitioned by `group_by`.
    pub fn sorted_by(&mut self, attribute: &'static str, group_by: &'static str) -> &mut Self {
        self.register(attribute, IndexOptions::group_by(group_by))
    }

    #[must_use]
    pub fn definitions(&self) -> &[IndexDefinition] {
        &self.definitions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Whether a definition exactly equal to `(attribute, options)` exists.
    #[must_use]
    pub fn exists(&self, attribute: &str, options: &LookupOptions<'_>) -> bool {
        self.find(attribute, options).is_some()
    }

    /// Resolve the definition addressed by `attribute` and a group selector.
    pub fn lookup(
        &self,
        attribute: &str,
        selector: &GroupSelector,
    ) -> Result<&IndexDefinition, InternalError> {
        let options = LookupOptions::new(selector.group_attribute()?);

        self.find(attribute, &options).ok_or_else(|| {
            InternalError::index_not_found(attribute, options.group_by.map(str::to_string))
        })
    }

    fn find(&self, attribute: &str, options: &LookupOptions<'_>) -> Option<&IndexDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.matches(attribute, options))
    }
}
