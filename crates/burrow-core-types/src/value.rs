//! Scalar property values
//!
//! `Value` is the dynamic representation of a single scalar property on a
//! tracked entity. Change detection compares values with `PartialEq`
//! (value equality, never reference equality).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::key::KeyComponent;

/// A scalar property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent / unset value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl Value {
    /// Check whether this value is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's type, for error messages and logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Convert to a key component, if this value can participate in a key
    ///
    /// `Null` has no key form (a pending store-generated key), and `Float`
    /// is excluded because it has no total equality / stable hash.
    pub fn as_key_component(&self) -> Option<KeyComponent> {
        match self {
            Value::Null | Value::Float(_) => None,
            Value::Bool(b) => Some(KeyComponent::Bool(*b)),
            Value::Int(i) => Some(KeyComponent::Int(*i)),
            Value::Text(s) => Some(KeyComponent::Text(s.clone())),
            Value::Uuid(u) => Some(KeyComponent::Uuid(*u)),
            Value::Bytes(b) => Some(KeyComponent::Bytes(b.clone())),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}
