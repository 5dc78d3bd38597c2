//! Dynamically typed property values.
//!
//! Each property is declared with a [`ValueKind`] and only ever holds a
//! [`Value`] of that kind.

use crate::builder::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind tag of a property value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
    Float,
    Composite,
}

impl ValueKind {
    /// Canonical configuration tag for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Composite => "composite",
        }
    }

    /// Value used when a configuration omits the initial value.
    pub fn default_value(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Integer => Value::Integer(0),
            Self::Boolean => Value::Boolean(false),
            Self::Float => Value::Float(0.0),
            Self::Composite => Value::Composite(serde_json::Value::Object(Default::default())),
        }
    }
}

/// Parses a configuration tag. `bigint`, `number` and `object` are
/// accepted as aliases of `integer`, `float` and `composite`.
impl FromStr for ValueKind {
    type Err = BuildError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "string" => Ok(Self::String),
            "integer" | "bigint" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "float" | "number" => Ok(Self::Float),
            "composite" | "object" => Ok(Self::Composite),
            other => Err(BuildError::UnknownValueKind(other.to_string())),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A property value.
///
/// Composite values are owned JSON documents; cloning one copies the whole
/// tree, so a value handed out by a read never aliases the stored one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Float(f64),
    Composite(serde_json::Value),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Integer(_) => ValueKind::Integer,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Float(_) => ValueKind::Float,
            Self::Composite(_) => ValueKind::Composite,
        }
    }

    /// Interpret a configuration JSON value as a value of `kind`.
    ///
    /// Returns `None` when the JSON does not fit the kind. Integral JSON
    /// numbers are accepted for float properties.
    pub fn from_json(kind: ValueKind, json: &serde_json::Value) -> Option<Self> {
        match kind {
            ValueKind::String => json.as_str().map(|s| Self::String(s.to_string())),
            ValueKind::Integer => json.as_i64().map(Self::Integer),
            ValueKind::Boolean => json.as_bool().map(Self::Boolean),
            ValueKind::Float => json.as_f64().map(Self::Float),
            ValueKind::Composite if json.is_object() || json.is_array() => {
                Some(Self::Composite(json.clone()))
            }
            ValueKind::Composite => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Composite(doc) => Some(doc),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Composite(doc) => write!(f, "{doc}"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<serde_json::Value> for Value {
    fn from(doc: serde_json::Value) -> Self {
        Self::Composite(doc)
    }
}
