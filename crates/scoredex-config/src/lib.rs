//! TOML configuration for scoredex.
//!
//! Index policy lives in a `[sorted]` table:
//!
//! ```toml
//! [sorted]
//! missing_attribute = "skip"     # zero | skip | fail
//! read_consistency = "strict"    # missing_ok | strict
//! ```
//!
//! Every key is optional; absent keys keep the runtime defaults.


use scoredex_core::{
    config::{IndexConfig, MissingAttributePolicy},
    db::record::ReadConsistency,
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        let class = match &err {
            ConfigError::Io { .. } => ErrorClass::Unavailable,
            ConfigError::Parse(_) => ErrorClass::InvalidArgument,
        };

        Self::new(class, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ConfigFile
///
/// Top-level layout of a scoredex config file. Unknown tables and keys
/// are rejected so typos do not silently fall back to defaults.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub sorted: SortedSection,
}

impl ConfigFile {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), config = ?file.sorted, "loaded sorted index config");

        Ok(file)
    }

    /// Runtime policy described by this file.
    #[must_use]
    pub const fn index_config(&self) -> IndexConfig {
        self.sorted.into_index_config()
    }
}

///
/// SortedSection
///
/// The `[sorted]` table.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortedSection {
    pub missing_attribute: Option<MissingAttributePolicy>,
    pub read_consistency: Option<ReadConsistency>,
}

impl SortedSection {
    #[must_use]
    pub const fn into_index_config(self) -> IndexConfig {
        let mut config = IndexConfig::new();
        if let Some(policy) = self.missing_attribute {
            config = config.with_missing_attribute(policy);
        }
        if let Some(consistency) = self.read_consistency {
            config = config.with_read_consistency(consistency);
        }

        config
    }
}

/// Parse the index policy from TOML text.
pub fn load_from_str(source: &str) -> Result<IndexConfig, ConfigError> {
    ConfigFile::from_toml_str(source).map(|file| file.index_config())
}

/// Read and parse the index policy from `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<IndexConfig, ConfigError> {
    ConfigFile::from_path(path).map(|file| file.index_config())
}

/// Like `load_from_path`, but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<IndexConfig, ConfigError> {
    match load_from_path(path.as_ref()) {
        Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.as_ref().display(), "no sorted index config, using defaults");
            Ok(IndexConfig::default())
        }
        result => result,
    }
}
