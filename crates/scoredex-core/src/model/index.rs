use serde::Serialize;
use std::fmt::{self, Display};

///
/// IndexOptions
///
/// Normalized options of a sorted index definition.
/// Compared structurally: `{}` and `{group_by: x}` never match each other.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct IndexOptions {
    pub group_by: Option<&'static str>,
}

impl IndexOptions {
    /// Options of an ungrouped index.
    pub const NONE: Self = Self { group_by: None };

    #[must_use]
    pub const fn group_by(attribute: &'static str) -> Self {
        Self {
            group_by: Some(attribute),
        }
    }

    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        self.group_by.is_some()
    }
}

///
/// IndexDefinition
/// Declares that `attribute` is kept sorted, optionally partitioned by
/// `options.group_by`. Immutable once registered.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct IndexDefinition {
    pub attribute: &'static str,
    pub options: IndexOptions,
}

impl IndexDefinition {
    #[must_use]
    pub const fn new(attribute: &'static str, options: IndexOptions) -> Self {
        Self { attribute, options }
    }

    #[must_use]
    pub const fn sorted(attribute: &'static str) -> Self {
        Self::new(attribute, IndexOptions::NONE)
    }

    #[must_use]
    pub const fn grouped(attribute: &'static str, group_by: &'static str) -> Self {
        Self::new(attribute, IndexOptions::group_by(group_by))
    }

    #[must_use]
    pub const fn group_by(&self) -> Option<&'static str> {
        self.options.group_by
    }

    /// Whether this definition answers a lookup for `(attribute, options)`.
    #[must_use]
    pub fn matches(&self, attribute: &str, options: &LookupOptions<'_>) -> bool {
        self.attribute == attribute && self.options.group_by == options.group_by
    }
}

impl Display for IndexDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.options.group_by {
            Some(group_by) => write!(f, "SORTED {} BY {group_by}", self.attribute),
            None => write!(f, "SORTED {}", self.attribute),
        }
    }
}

///
/// LookupOptions
///
/// Borrowed counterpart of `IndexOptions`, derived from a query's group
/// selector at lookup time.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LookupOptions<'a> {
    pub group_by: Option<&'a str>,
}

impl<'a> LookupOptions<'a> {
    #[must_use]
    pub const fn new(group_by: Option<&'a str>) -> Self {
        Self { group_by }
    }
}

impl From<IndexOptions> for LookupOptions<'static> {
    fn from(options: IndexOptions) -> Self {
        Self {
            group_by: options.group_by,
        }
    }
}
