use crate::{config::ConfigError, core::error::InternalError};
use thiserror::Error as ThisError;

pub use crate::core::error::{ErrorClass, ErrorOrigin};

///
/// Error
/// Public error type with a stable class + origin taxonomy.
/// Structured detail stays on `InternalError`; hosts that need it should
/// match on the core error before converting.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(err.class, err.origin, err.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        InternalError::from(err).into()
    }
}
