//! Entity identity values
//!
//! An `IdentityValue` is the comparable, hashable identity derived from an
//! entity's key property values. Composite keys keep the declared key
//! order; the same ordered list of key values always produces the same
//! identity for a given entity type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

/// One component of an identity value
///
/// This is the `Eq + Hash` subset of [`Value`]: `Null` and `Float` have no
/// key form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyComponent {
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl std::fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyComponent::Bool(b) => write!(f, "{}", b),
            KeyComponent::Int(i) => write!(f, "{}", i),
            KeyComponent::Text(s) => write!(f, "{}", s),
            KeyComponent::Uuid(u) => write!(f, "{}", u),
            KeyComponent::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Identity derived from an entity's ordered key property values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityValue {
    components: Vec<KeyComponent>,
}

impl IdentityValue {
    /// Build an identity from ordered key values
    ///
    /// Returns `None` when any value has no key form (unset key, e.g. a
    /// store-generated key pending insert). Such entities are tracked by
    /// entry handle alone until a key is assigned.
    pub fn from_values(values: &[Value]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let components = values
            .iter()
            .map(Value::as_key_component)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { components })
    }

    /// The ordered key components
    pub fn components(&self) -> &[KeyComponent] {
        &self.components
    }
}

impl std::fmt::Display for IdentityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_values_rejects_unset_keys() {
        assert!(IdentityValue::from_values(&[]).is_none());
        assert!(IdentityValue::from_values(&[Value::Null]).is_none());
        assert!(IdentityValue::from_values(&[Value::Int(1), Value::Null]).is_none());
        assert!(IdentityValue::from_values(&[Value::Float(1.0)]).is_none());
    }

    #[test]
    fn test_composite_order_is_significant() {
        let a = IdentityValue::from_values(&[Value::Int(1), Value::from("x")]).unwrap();
        let b = IdentityValue::from_values(&[Value::from("x"), Value::Int(1)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_equal_values_equal_identity() {
        let a = IdentityValue::from_values(&[Value::Int(7)]).unwrap();
        let b = IdentityValue::from_values(&[Value::Int(7)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "7");
    }
}
