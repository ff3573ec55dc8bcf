use serde::{Deserialize, Serialize};

use crate::errors::{BurrowError, Result};
use crate::model::discovery::{discover_key, KeyDiscoveryOptions};

/// Metadata for one scalar property of an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMeta {
    /// Property name, unique within the entity type
    pub name: String,

    /// Whether this property participates in the primary key
    pub is_key: bool,

    /// Whether the backing store generates the value on insert
    pub store_generated: bool,
}

impl PropertyMeta {
    /// Create a plain (non-key, caller-assigned) property
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: false,
            store_generated: false,
        }
    }

    /// Create a key property
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: true,
            store_generated: false,
        }
    }

    /// Create a store-generated key property
    pub fn generated_key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_key: true,
            store_generated: true,
        }
    }
}

/// A foreign-key-bearing relationship from a dependent entity type to a
/// principal entity type
///
/// The relationship is expressed entirely through the scalar foreign-key
/// property on the dependent; fixup resolves the principal via the
/// identity map rather than through object references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationMeta {
    /// Relationship name (for diagnostics)
    pub name: String,

    /// Principal entity type this navigation points at
    pub target: String,

    /// Scalar property on the dependent holding the principal's key
    pub foreign_key: String,
}

/// Describes an entity type: its scalar properties, ordered primary key,
/// and navigation relationships
///
/// Built once at model-build time and shared as `Arc<EntityMetadata>`;
/// the core consumes it read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Entity type name
    pub entity_type: String,

    /// Scalar properties in declaration order
    pub properties: Vec<PropertyMeta>,

    /// Ordered key property names (order significant for composite keys)
    pub key: Vec<String>,

    /// Navigation relationships where this type is the dependent
    pub navigations: Vec<NavigationMeta>,
}

impl EntityMetadata {
    /// Create metadata with an explicit key
    ///
    /// Key property names are taken from `properties` entries flagged
    /// `is_key`, in declaration order.
    pub fn new(entity_type: impl Into<String>, properties: Vec<PropertyMeta>) -> Self {
        let key = properties
            .iter()
            .filter(|p| p.is_key)
            .map(|p| p.name.clone())
            .collect();
        Self {
            entity_type: entity_type.into(),
            properties,
            key,
            navigations: Vec::new(),
        }
    }

    /// Create metadata discovering the key property by convention
    ///
    /// # Errors
    /// * `AmbiguousKey` - more than one candidate key property found
    /// * `MissingKey` - no candidate key property found
    pub fn with_discovered_key(
        entity_type: impl Into<String>,
        mut properties: Vec<PropertyMeta>,
        options: &KeyDiscoveryOptions,
    ) -> Result<Self> {
        let entity_type = entity_type.into();
        let names: Vec<&str> = properties.iter().map(|p| p.name.as_str()).collect();
        let key = discover_key(&entity_type, &names, options)?;
        for p in &mut properties {
            if key.contains(&p.name) {
                p.is_key = true;
            }
        }
        Ok(Self {
            entity_type,
            properties,
            key,
            navigations: Vec::new(),
        })
    }

    /// Add a navigation relationship
    pub fn with_navigation(mut self, navigation: NavigationMeta) -> Self {
        self.navigations.push(navigation);
        self
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Require a property by name
    ///
    /// # Errors
    /// * `UnknownProperty` - the property is not declared on this type
    pub fn require_property(&self, name: &str) -> Result<&PropertyMeta> {
        self.property(name).ok_or_else(|| BurrowError::UnknownProperty {
            entity_type: self.entity_type.clone(),
            property: name.to_string(),
        })
    }

    /// Key properties in declared key order
    pub fn key_properties(&self) -> impl Iterator<Item = &PropertyMeta> {
        self.key.iter().filter_map(|name| self.property(name))
    }

    /// All scalar property names in declaration order
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    /// Whether any key property is store-generated
    pub fn has_store_generated_key(&self) -> bool {
        self.key_properties().any(|p| p.store_generated)
    }
}
