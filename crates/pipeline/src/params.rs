//! Named, typed operator parameters.
//!
//! Every operator lists its tunable parameters and accepts updates by name,
//! so external tooling can configure a pipeline from an [`OperatorSpec`]
//! document without knowing the concrete operator types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strand_core::Tag;
use thiserror::Error;

/// A parameter value.
///
/// Serialized untagged, so a JSON document can write `15.0`, `true`, `"A;B"`
/// or `[0.5, 0.5]` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Vector(Vec<f64>),
}

impl ParamValue {
    /// Returns a short name of the value's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
        }
    }

    /// Reads a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for any other kind.
    pub fn as_bool(&self, name: &str) -> Result<bool, ParamError> {
        match *self {
            Self::Bool(b) => Ok(b),
            _ => Err(self.mismatch(name, "bool")),
        }
    }

    /// Reads a non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for a non-integer value and
    /// [`ParamError::Invalid`] for a negative one.
    pub fn as_usize(&self, name: &str) -> Result<usize, ParamError> {
        match *self {
            Self::Integer(i) => usize::try_from(i).map_err(|_| ParamError::Invalid {
                name: name.to_owned(),
                reason: format!("{i} is negative"),
            }),
            _ => Err(self.mismatch(name, "integer")),
        }
    }

    /// Reads a signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for a non-integer value.
    pub fn as_i64(&self, name: &str) -> Result<i64, ParamError> {
        match *self {
            Self::Integer(i) => Ok(i),
            _ => Err(self.mismatch(name, "integer")),
        }
    }

    /// Reads a real number; integers are widened.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for non-numeric values.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self, name: &str) -> Result<f64, ParamError> {
        match *self {
            Self::Real(x) => Ok(x),
            Self::Integer(i) => Ok(i as f64),
            _ => Err(self.mismatch(name, "real")),
        }
    }

    /// Reads text.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for non-text values.
    pub fn as_text(&self, name: &str) -> Result<&str, ParamError> {
        match self {
            Self::Text(s) => Ok(s),
            _ => Err(self.mismatch(name, "text")),
        }
    }

    /// Reads a vector of reals.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for non-vector values.
    pub fn as_vector(&self, name: &str) -> Result<&[f64], ParamError> {
        match self {
            Self::Vector(v) => Ok(v),
            _ => Err(self.mismatch(name, "vector")),
        }
    }

    /// Reads a delimited tag list.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::Type`] for non-text values.
    pub fn as_tags(&self, name: &str) -> Result<Vec<Tag>, ParamError> {
        self.as_text(name).map(Tag::parse_list)
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> ParamError {
        ParamError::Type {
            name: name.to_owned(),
            expected,
            found: self.kind(),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<usize> for ParamValue {
    fn from(n: usize) -> Self {
        Self::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        Self::Real(x)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Vector(v)
    }
}

impl From<&[Tag]> for ParamValue {
    fn from(tags: &[Tag]) -> Self {
        Self::Text(Tag::join_list(tags))
    }
}

/// Errors raised when reading or writing a parameter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter `{0}`")]
    Unknown(String),

    #[error("parameter `{name}` expects {expected}, got {found}")]
    Type {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter `{name}` is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

impl ParamError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A parameter as listed by an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
    pub value: ParamValue,
}

impl Parameter {
    #[must_use]
    pub fn new(name: &'static str, description: &'static str, value: impl Into<ParamValue>) -> Self {
        Self {
            name,
            description,
            value: value.into(),
        }
    }
}

/// An operator name and the parameter values to apply after construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub name: String,

    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

impl OperatorSpec {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}
