//! Core runtime for scoredex: secondary sorted indices kept in score-ordered
//! set stores, the lifecycle maintainer that keeps them current, and the
//! lazy sorted views used to read them back.

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary for declaring and reading sorted indices.
/// Stores, observers and error types stay one level down.
///

pub mod prelude {
    pub use crate::{
        db::{GroupSelector, SortedIndexes, SortedIndexesBuilder, SortedSet},
        model::index::{IndexDefinition, IndexOptions},
        value::Value,
    };
}
