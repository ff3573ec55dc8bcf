use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use burrow_core_types::Value;

use crate::errors::{BurrowError, Result};

/// Capability for reading and writing scalar properties of an entity
///
/// This replaces runtime reflection: each entity shape implements (or is
/// wrapped by) this trait once, and the tracking core uses it for every
/// snapshot, comparison, and generated-key write-back.
pub trait EntityAccess: std::fmt::Debug + Send {
    /// Read a property value; `None` when the shape has no such property
    fn get_value(&self, property: &str) -> Option<Value>;

    /// Write a property value; returns `false` when the shape rejects the
    /// property (unknown name)
    fn set_value(&mut self, property: &str, value: Value) -> bool;
}

/// Map-backed entity shape for dynamic records and tests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style property assignment
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(property.into(), value.into());
        self
    }

    /// Read a property without cloning
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// Build a record from a JSON object
    ///
    /// Nested objects and arrays have no scalar form and are rejected.
    ///
    /// # Errors
    /// * `InvalidValue` - input is not an object, or a field is not scalar
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(fields) = json else {
            return Err(BurrowError::InvalidValue {
                reason: "record must be a JSON object".to_string(),
            });
        };
        let mut values = BTreeMap::new();
        for (name, field) in fields {
            let value = match field {
                serde_json::Value::Null => Value::Null,
                serde_json::Value::Bool(b) => Value::Bool(b),
                serde_json::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Value::Int(i)
                    } else if let Some(f) = n.as_f64() {
                        Value::Float(f)
                    } else {
                        return Err(BurrowError::InvalidValue {
                            reason: format!("number out of range in field {}", name),
                        });
                    }
                }
                serde_json::Value::String(s) => Value::Text(s),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(BurrowError::InvalidValue {
                        reason: format!("field {} is not a scalar", name),
                    });
                }
            };
            values.insert(name, value);
        }
        Ok(Self { values })
    }
}

impl EntityAccess for Record {
    fn get_value(&self, property: &str) -> Option<Value> {
        self.values.get(property).cloned()
    }

    fn set_value(&mut self, property: &str, value: Value) -> bool {
        self.values.insert(property.to_string(), value);
        true
    }
}
