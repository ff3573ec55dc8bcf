use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use burrow_core_types::{EntryId, IdentityValue, Value};

use crate::errors::{BurrowError, Result};
use crate::model::{EntityAccess, EntityMetadata};
use crate::tracking::detector;
use crate::tracking::entry::Entry;
use crate::tracking::state::EntityState;

/// Identity map and entry arena for one unit of work
///
/// Owns every tracked [`Entry`] and guarantees one entry per logical
/// identity. Entries without a resolvable identity (store-generated key
/// pending insert) are tracked by handle alone until a key is assigned.
///
/// Not designed for concurrent mutation: one detect/mutate/save sequence
/// at a time per manager, like a session owning a transaction. Separate
/// managers share nothing mutable.
#[derive(Debug)]
pub struct StateManager {
    /// Arena of tracked entries; BTreeMap gives deterministic iteration
    /// and save submission order
    entries: BTreeMap<EntryId, Entry>,
    /// (entity type, identity) -> entry handle
    identity_map: HashMap<(String, IdentityValue), EntryId>,
    next_entry: u64,
    auto_detect: bool,
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StateManager {
    /// Create an empty state manager with auto-detection enabled
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            identity_map: HashMap::new(),
            next_entry: 0,
            auto_detect: true,
        }
    }

    /// Whether change detection runs automatically before saves and
    /// mutable entry lookups
    pub fn auto_detect_changes(&self) -> bool {
        self.auto_detect
    }

    /// Enable or disable automatic change detection
    ///
    /// With detection disabled the caller must invoke
    /// [`StateManager::detect_changes`] explicitly before relying on
    /// entry states being accurate.
    pub fn set_auto_detect_changes(&mut self, enabled: bool) {
        self.auto_detect = enabled;
    }

    /// Number of tracked entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ===== Registration =====

    /// Begin tracking an entity scheduled for insertion (`Added`)
    ///
    /// No identity is required yet; if the key happens to be set and
    /// collides with a tracked entry, that is a conflict like any other.
    ///
    /// # Errors
    /// * `TrackingConflict` - identity already tracked by another instance
    pub fn add(
        &mut self,
        metadata: Arc<EntityMetadata>,
        entity: Box<dyn EntityAccess>,
    ) -> Result<EntryId> {
        self.insert_entry(metadata, entity, EntityState::Added)
    }

    /// Begin tracking an entity as already persisted and unmodified
    /// (`Unchanged`); the original-value snapshot is taken now
    ///
    /// # Errors
    /// * `TrackingConflict` - identity already tracked by another instance
    pub fn attach(
        &mut self,
        metadata: Arc<EntityMetadata>,
        entity: Box<dyn EntityAccess>,
    ) -> Result<EntryId> {
        self.insert_entry(metadata, entity, EntityState::Unchanged)
    }

    /// Begin tracking an entity as persisted with every property changed
    /// (`Modified`)
    ///
    /// # Errors
    /// * `TrackingConflict` - identity already tracked by another instance
    pub fn update(
        &mut self,
        metadata: Arc<EntityMetadata>,
        entity: Box<dyn EntityAccess>,
    ) -> Result<EntryId> {
        self.insert_entry(metadata, entity, EntityState::Modified)
    }

    /// Get-or-create tracking for an entity instance
    ///
    /// With an untracked identity this begins tracking the instance as
    /// `Unchanged` (create). With an already-mapped identity the existing
    /// handle is returned (get) only when the offered instance is
    /// indistinguishable from the tracked one, meaning every property
    /// value is equal; the arena owns tracked objects, so value equality
    /// is the instance notion. A differing instance is a conflict:
    /// tracking is never silently forked or replaced.
    ///
    /// # Errors
    /// * `TrackingConflict` - identity tracked by a differing instance
    pub fn get_or_create(
        &mut self,
        metadata: Arc<EntityMetadata>,
        entity: Box<dyn EntityAccess>,
    ) -> Result<EntryId> {
        let key_values: Vec<Value> = metadata
            .key
            .iter()
            .map(|name| entity.get_value(name).unwrap_or(Value::Null))
            .collect();
        if let Some(identity) = IdentityValue::from_values(&key_values) {
            let map_key = (metadata.entity_type.clone(), identity.clone());
            if let Some(&existing) = self.identity_map.get(&map_key) {
                let tracked = self
                    .entries
                    .get(&existing)
                    .ok_or(BurrowError::EntryNotFound { entry_id: existing })?;
                let same_instance = metadata
                    .property_names()
                    .all(|name| tracked.entity().get_value(name) == entity.get_value(name));
                if same_instance {
                    return Ok(existing);
                }
                return Err(BurrowError::TrackingConflict {
                    entity_type: metadata.entity_type.clone(),
                    identity: identity.to_string(),
                });
            }
        }
        self.attach(metadata, entity)
    }

    fn insert_entry(
        &mut self,
        metadata: Arc<EntityMetadata>,
        entity: Box<dyn EntityAccess>,
        initial: EntityState,
    ) -> Result<EntryId> {
        debug_assert!(EntityState::Detached.can_transition_to(initial));

        let id = EntryId::from_raw(self.next_entry);
        let mut entry = Entry::new(id, metadata, entity);

        let identity = entry.resolve_identity();
        if let Some(identity) = &identity {
            let map_key = (entry.entity_type().to_string(), identity.clone());
            if self.identity_map.contains_key(&map_key) {
                return Err(BurrowError::TrackingConflict {
                    entity_type: entry.entity_type().to_string(),
                    identity: identity.to_string(),
                });
            }
            self.identity_map.insert(map_key, id);
        }
        entry.set_identity(identity);

        entry.take_snapshot();
        if initial == EntityState::Modified {
            entry.mark_all_changed();
        }
        entry.set_state(initial);

        tracing::debug!(
            entry_id = %id,
            entity_type = entry.entity_type(),
            state = %initial,
            "entry registered"
        );

        self.next_entry += 1;
        self.entries.insert(id, entry);
        Ok(id)
    }

    // ===== Lookup =====

    /// Look up an entry by handle
    ///
    /// # Errors
    /// * `EntryNotFound` - no tracked entry under this handle
    pub fn entry(&self, id: EntryId) -> Result<&Entry> {
        self.entries
            .get(&id)
            .ok_or(BurrowError::EntryNotFound { entry_id: id })
    }

    /// Look up an entry mutably; this is the caller's mutation path
    ///
    /// Runs the entry's change detection first when auto-detection is
    /// enabled, so the state observed reflects earlier edits.
    ///
    /// # Errors
    /// * `EntryNotFound` - no tracked entry under this handle
    pub fn entry_mut(&mut self, id: EntryId) -> Result<&mut Entry> {
        let auto_detect = self.auto_detect;
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(BurrowError::EntryNotFound { entry_id: id })?;
        if auto_detect {
            entry.detect();
        }
        Ok(entry)
    }

    /// Look up an entry handle by identity
    pub fn entry_by_identity(
        &self,
        entity_type: &str,
        identity: &IdentityValue,
    ) -> Option<EntryId> {
        self.identity_map
            .get(&(entity_type.to_string(), identity.clone()))
            .copied()
    }

    /// Iterate all tracked entries in handle order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Handles of entries in a pending state, in deterministic order
    pub fn pending_ids(&self) -> Vec<EntryId> {
        self.entries
            .values()
            .filter(|e| e.state().is_pending())
            .map(Entry::id)
            .collect()
    }

    // ===== State transitions =====

    /// Request an explicit state transition
    ///
    /// Same-state requests are no-ops. Requesting `Deleted` on an `Added`
    /// entry downgrades to `Detached` instead: a never-persisted entity
    /// must not emit a delete operation. Transitioning to `Detached`
    /// removes the entry from the arena and the identity map; the handle
    /// is discarded, not reused.
    ///
    /// # Errors
    /// * `EntryNotFound` - no tracked entry under this handle
    /// * `InvalidTransition` - the transition is outside the state machine
    pub fn set_entity_state(&mut self, id: EntryId, target: EntityState) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(BurrowError::EntryNotFound { entry_id: id })?;
        let from = entry.state();
        if from == target {
            return Ok(());
        }

        // Delete of a never-persisted entity is a no-op against the store
        let effective = if from == EntityState::Added && target == EntityState::Deleted {
            EntityState::Detached
        } else {
            target
        };

        if !from.can_transition_to(effective) {
            return Err(BurrowError::InvalidTransition {
                entity_type: entry.entity_type().to_string(),
                from,
                to: target,
            });
        }

        tracing::debug!(
            entry_id = %id,
            entity_type = entry.entity_type(),
            from = %from,
            to = %effective,
            "state transition"
        );

        match effective {
            EntityState::Modified => {
                entry.mark_all_changed();
                entry.set_state(EntityState::Modified);
            }
            EntityState::Unchanged => {
                entry.accept();
            }
            EntityState::Deleted => {
                entry.set_state(EntityState::Deleted);
            }
            EntityState::Detached => {
                self.remove_entry(id);
            }
            EntityState::Added => {
                // Only reachable from Detached, which never lives in the
                // arena; kept for the exhaustive match
                entry.set_state(EntityState::Added);
            }
        }
        Ok(())
    }

    /// Request removal of a tracked entity
    ///
    /// # Errors
    /// * `EntryNotFound` - no tracked entry under this handle
    /// * `InvalidTransition` - entry is not in a deletable state
    pub fn delete(&mut self, id: EntryId) -> Result<()> {
        self.set_entity_state(id, EntityState::Deleted)
    }

    // ===== Change detection =====

    /// Run the change-detection pass over every detectable entry
    ///
    /// Returns the number of entries ending up `Modified`.
    pub fn detect_changes(&mut self) -> usize {
        detector::detect_changes(self)
    }

    // ===== Crate-internal plumbing for detector and save pipeline =====

    pub(crate) fn entries_internal_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    pub(crate) fn entry_internal_mut(&mut self, id: EntryId) -> Result<&mut Entry> {
        self.entries
            .get_mut(&id)
            .ok_or(BurrowError::EntryNotFound { entry_id: id })
    }

    /// Remove an entry and its identity mapping; the entry is discarded
    pub(crate) fn remove_entry(&mut self, id: EntryId) {
        if let Some(entry) = self.entries.remove(&id) {
            if let Some(identity) = entry.identity() {
                self.identity_map
                    .remove(&(entry.entity_type().to_string(), identity.clone()));
            }
        }
    }

    /// Re-register an entry under a new identity after key assignment
    ///
    /// The sanctioned path for an identity change: post-insert
    /// store-generated key write-back.
    ///
    /// # Errors
    /// * `EntryNotFound` - no tracked entry under this handle
    /// * `TrackingConflict` - the new identity is mapped to another entry
    pub(crate) fn rebind_identity(
        &mut self,
        id: EntryId,
        new_identity: Option<IdentityValue>,
    ) -> Result<()> {
        let entry = self
            .entries
            .get(&id)
            .ok_or(BurrowError::EntryNotFound { entry_id: id })?;
        let entity_type = entry.entity_type().to_string();
        let old_identity = entry.identity().cloned();
        if old_identity == new_identity {
            return Ok(());
        }

        if let Some(new_identity) = &new_identity {
            let map_key = (entity_type.clone(), new_identity.clone());
            if let Some(other) = self.identity_map.get(&map_key) {
                if *other != id {
                    return Err(BurrowError::TrackingConflict {
                        entity_type,
                        identity: new_identity.to_string(),
                    });
                }
            }
        }

        if let Some(old_identity) = old_identity {
            self.identity_map.remove(&(entity_type.clone(), old_identity));
        }
        if let Some(new_identity) = new_identity.clone() {
            self.identity_map.insert((entity_type, new_identity), id);
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.set_identity(new_identity);
        }
        Ok(())
    }
}
