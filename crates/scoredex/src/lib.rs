//! ## Crate layout
//! - `core`: index keys, definitions, maintainer, sorted views, store port.
//! - `config`: TOML loading for index policy.
//! - `error`: public error type with a stable class + origin taxonomy.
//!
//! Hosts declare indices once per model type, register the maintainer with
//! their lifecycle chain, and read through `SortedIndexes::sorted_find`.

pub use scoredex_config as config;
pub use scoredex_core as core;

pub mod error;

pub use error::Error;

use crate::core::db::SortedIndexesBuilder;
use std::path::Path;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Start declaring indices for `namespace` with policy read from `path`.
///
/// A missing file means defaults; a malformed one is an error.
pub fn configured(
    namespace: impl Into<String>,
    path: impl AsRef<Path>,
) -> Result<SortedIndexesBuilder, Error> {
    let config = config::load_or_default(path)?;

    Ok(SortedIndexesBuilder::new(namespace).config(config))
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        db::{
            CallContext, GroupSelector, SortedIndexes, SortedIndexesBuilder, SortedSet,
            lifecycle::{LifecycleHook, LifecycleObserver, ObserverChain},
            record::{Record, RecordLayer, RecordState},
            store::SortedSetStore,
        },
        model::index::IndexOptions,
        value::Value,
    };
}
