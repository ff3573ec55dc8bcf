use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use burrow_core_types::{EntryId, IdentityValue, Value};

use crate::model::{EntityAccess, EntityMetadata};
use crate::tracking::state::EntityState;

/// Tracking record pairing one entity instance with its lifecycle state
/// and original-value snapshot
///
/// An entry owns its entity object; callers mutate the entity through
/// [`Entry::entity_mut`] and address the entry via its [`EntryId`] handle.
#[derive(Debug)]
pub struct Entry {
    id: EntryId,
    metadata: Arc<EntityMetadata>,
    entity: Box<dyn EntityAccess>,
    state: EntityState,
    /// Property values at the last known-synchronized point
    original: BTreeMap<String, Value>,
    /// Properties whose current value differs from the snapshot
    changed: BTreeSet<String>,
    identity: Option<IdentityValue>,
    snapshot_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub(crate) fn new(
        id: EntryId,
        metadata: Arc<EntityMetadata>,
        entity: Box<dyn EntityAccess>,
    ) -> Self {
        Self {
            id,
            metadata,
            entity,
            state: EntityState::Detached,
            original: BTreeMap::new(),
            changed: BTreeSet::new(),
            identity: None,
            snapshot_at: None,
        }
    }

    /// Entry handle
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Metadata of the tracked entity type
    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    /// Entity type name shortcut
    pub fn entity_type(&self) -> &str {
        &self.metadata.entity_type
    }

    /// Identity computed from key property values, if resolvable
    pub fn identity(&self) -> Option<&IdentityValue> {
        self.identity.as_ref()
    }

    /// Read access to the tracked entity
    pub fn entity(&self) -> &dyn EntityAccess {
        self.entity.as_ref()
    }

    /// Mutable access to the tracked entity
    ///
    /// Edits made here are picked up by the next change-detection pass.
    pub fn entity_mut(&mut self) -> &mut dyn EntityAccess {
        self.entity.as_mut()
    }

    /// Properties currently differing from the original snapshot
    pub fn changed_properties(&self) -> &BTreeSet<String> {
        &self.changed
    }

    /// Snapshot value of one property
    pub fn original_value(&self, property: &str) -> Option<&Value> {
        self.original.get(property)
    }

    /// When the current snapshot was taken
    pub fn snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot_at
    }

    /// Current value of every scalar property, unset properties as `Null`
    pub fn current_values(&self) -> BTreeMap<String, Value> {
        self.metadata
            .property_names()
            .map(|name| {
                (
                    name.to_string(),
                    self.entity.get_value(name).unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    /// Compute identity from the entity's key property values
    ///
    /// `None` when any key value is unset (store-generated key pending
    /// insert) or has no key form.
    pub fn resolve_identity(&self) -> Option<IdentityValue> {
        let key_values: Vec<Value> = self
            .metadata
            .key
            .iter()
            .map(|name| self.entity.get_value(name).unwrap_or(Value::Null))
            .collect();
        IdentityValue::from_values(&key_values)
    }

    pub(crate) fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    pub(crate) fn set_identity(&mut self, identity: Option<IdentityValue>) {
        self.identity = identity;
    }

    /// Capture the current values as the new original snapshot
    pub(crate) fn take_snapshot(&mut self) {
        self.original = self.current_values();
        self.changed.clear();
        self.snapshot_at = Some(Utc::now());
    }

    /// Mark every scalar property changed (registration as Modified)
    pub(crate) fn mark_all_changed(&mut self) {
        self.changed = self
            .metadata
            .property_names()
            .map(|name| name.to_string())
            .collect();
    }

    /// Recompute the changed set against the snapshot and promote or
    /// demote the state accordingly
    ///
    /// Returns `true` when the entry ends up `Modified`. Only meaningful
    /// for entries in a detectable state; other states are untouched.
    pub(crate) fn detect(&mut self) -> bool {
        if !self.state.is_detectable() {
            return false;
        }
        let mut changed = BTreeSet::new();
        for name in self.metadata.property_names() {
            let current = self.entity.get_value(name).unwrap_or(Value::Null);
            let original = self.original.get(name).unwrap_or(&Value::Null);
            if current != *original {
                changed.insert(name.to_string());
            }
        }
        self.changed = changed;
        if self.changed.is_empty() {
            self.state = EntityState::Unchanged;
            false
        } else {
            self.state = EntityState::Modified;
            true
        }
    }

    /// Accept a successful insert or update: the current values become
    /// the new baseline
    pub(crate) fn accept(&mut self) {
        self.take_snapshot();
        self.state = EntityState::Unchanged;
    }
}
