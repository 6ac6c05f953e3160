
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Value
///
/// Attribute value as handed over by the host record layer.
///
/// None → the attribute is absent (unset or nil on the host side).
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Convert to a sortable score.
    ///
    /// `Ok(None)` means the value is absent; what that implies is decided by
    /// the caller's `MissingAttributePolicy`.
    #[expect(clippy::cast_precision_loss)]
    pub fn to_score(&self) -> Result<Option<f64>, ScoreError> {
        let score = match self {
            Self::None => return Ok(None),
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Int(n) => *n as f64,
            Self::Uint(n) => *n as f64,
            Self::Float(f) => *f,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| ScoreError::NotNumeric(s.clone()))?
            }
        };

        if score.is_nan() {
            return Err(ScoreError::NotANumber);
        }

        Ok(Some(score))
    }

    /// Render the value as a key segment.
    ///
    /// Absent values render as the empty string, so records without a group
    /// value still land in one deterministic set.
    #[must_use]
    pub fn to_segment(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Uint(n) => n.to_string(),
            Self::Float(f) => format_score(*f),
            Self::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Text(s) => write!(f, "{s:?}"),
            other => write!(f, "{}", other.to_segment()),
        }
    }
}

/// Canonical text form of a score: integral values drop the fraction.
/// `-0.0` renders as `0`, so equal scores always share a key segment.
#[must_use]
pub fn format_score(score: f64) -> String {
    let score = if score == 0.0 { 0.0 } else { score };

    if score.is_finite() && score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{score:.0}")
    } else {
        score.to_string()
    }
}

///
/// ScoreError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ScoreError {
    #[error("value is not numeric: {0:?}")]
    NotNumeric(String),

    #[error("value is NaN")]
    NotANumber,
}

// From impls so hosts can hand in plain Rust values.

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}
