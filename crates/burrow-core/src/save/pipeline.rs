//! Save pipeline
//!
//! detect -> collect -> delegate to the driver -> accept. All identity-map
//! bookkeeping and state transitions run without suspension; the async
//! variant suspends only at the driver call. On any rejection or driver
//! failure no acceptance happens at all: the tracking layer never commits
//! partially.

use std::collections::BTreeMap;

use burrow_core_types::{schema, CancelToken, EntryId, Value};

use crate::errors::{BurrowError, Result};
use crate::save::driver::{AsyncStoreDriver, SaveOutcome, SaveRequest, StoreDriver};
use crate::tracking::{EntityState, StateManager};

/// Persist all pending changes through the store driver
///
/// Runs change detection first unless the manager has auto-detection
/// disabled, submits every `Added`/`Modified`/`Deleted` entry in
/// deterministic handle order, and on success accepts changes on each of
/// them. Returns the number of entries persisted; `0` without any store
/// contact when nothing is pending.
///
/// # Errors
/// * `SaveRejected` - the driver rejected an entry; no entry is accepted
/// * `SaveFailed` - transport failure or malformed driver reply
pub fn save_changes(manager: &mut StateManager, driver: &mut dyn StoreDriver) -> Result<usize> {
    let (ids, batch) = prepare(manager)?;
    if ids.is_empty() {
        return Ok(0);
    }

    log_save_start(ids.len());
    let outcomes = match driver.save(&batch) {
        Ok(outcomes) => outcomes,
        Err(err) => {
            log_save_error(&err);
            return Err(err);
        }
    };
    finish(manager, &ids, &batch, outcomes)
}

/// Asynchronous, cancellable variant of [`save_changes`]
///
/// Identical semantics; additionally fails fast with `SaveCancelled`
/// when the token is already cancelled, before any state mutation and
/// without contacting the store. Mid-flight cancellation is the driver's
/// best effort.
///
/// # Errors
/// * `SaveCancelled` - cancellation observed before the store call
/// * `SaveRejected` / `SaveFailed` - as for [`save_changes`]
pub async fn save_changes_async(
    manager: &mut StateManager,
    driver: &mut (dyn AsyncStoreDriver + '_),
    cancel: CancelToken,
) -> Result<usize> {
    if cancel.is_cancelled() {
        let err = BurrowError::SaveCancelled;
        log_save_error(&err);
        return Err(err);
    }

    let (ids, batch) = prepare(manager)?;
    if ids.is_empty() {
        return Ok(0);
    }

    log_save_start(ids.len());
    let outcomes = match driver.save(&batch, &cancel).await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            log_save_error(&err);
            return Err(err);
        }
    };
    finish(manager, &ids, &batch, outcomes)
}

/// Detect (when enabled) and shape pending entries into save requests
fn prepare(manager: &mut StateManager) -> Result<(Vec<EntryId>, Vec<SaveRequest>)> {
    if manager.auto_detect_changes() {
        manager.detect_changes();
    }

    let ids = manager.pending_ids();
    let mut batch = Vec::with_capacity(ids.len());
    for id in &ids {
        let entry = manager.entry(*id)?;
        let metadata = entry.metadata();
        let values = match entry.state() {
            EntityState::Added => {
                // Store-generated keys are the driver's to assign; unset
                // values and pre-insert placeholders never reach the store
                let mut values = entry.current_values();
                for property in metadata.key_properties() {
                    if property.store_generated {
                        values.remove(&property.name);
                    }
                }
                values
            }
            EntityState::Modified => entry
                .changed_properties()
                .iter()
                .map(|name| {
                    (
                        name.clone(),
                        entry.entity().get_value(name).unwrap_or(Value::Null),
                    )
                })
                .collect(),
            EntityState::Deleted => metadata
                .key
                .iter()
                .map(|name| {
                    (
                        name.clone(),
                        entry.entity().get_value(name).unwrap_or(Value::Null),
                    )
                })
                .collect(),
            EntityState::Detached | EntityState::Unchanged => BTreeMap::new(),
        };
        batch.push(SaveRequest {
            entity_type: entry.entity_type().to_string(),
            state: entry.state(),
            identity: entry.identity().cloned(),
            key: metadata.key.clone(),
            values,
            changed: entry.changed_properties().iter().cloned().collect(),
        });
    }
    Ok((ids, batch))
}

/// Validate the driver reply, write back generated keys, accept changes,
/// and run fixup against the new baselines
fn finish(
    manager: &mut StateManager,
    ids: &[EntryId],
    batch: &[SaveRequest],
    outcomes: Vec<SaveOutcome>,
) -> Result<usize> {
    if outcomes.len() != ids.len() {
        let err = BurrowError::SaveFailed {
            reason: format!(
                "driver returned {} outcomes for {} requests",
                outcomes.len(),
                ids.len()
            ),
        };
        log_save_error(&err);
        return Err(err);
    }

    // Reject the whole call before touching any entry state
    for (request, outcome) in batch.iter().zip(&outcomes) {
        if let SaveOutcome::Rejected { reason } = outcome {
            let err = BurrowError::SaveRejected {
                entity_type: request.entity_type.clone(),
                reason: reason.clone(),
            };
            log_save_error(&err);
            return Err(err);
        }
    }

    // Write back generated keys and re-register identities
    let mut fixups: Vec<KeyFixup> = Vec::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        let SaveOutcome::AppliedWithKeys { keys } = outcome else {
            continue;
        };
        let id = ids[i];
        let entry = manager.entry_internal_mut(id)?;
        let metadata = entry.metadata().clone();
        for (property, value) in keys {
            metadata.require_property(property)?;
            // A shape refusing a declared property is out of sync with
            // its metadata; losing a generated key is never acceptable
            if !entry.entity_mut().set_value(property, value.clone()) {
                return Err(BurrowError::UnknownProperty {
                    entity_type: metadata.entity_type.clone(),
                    property: property.clone(),
                });
            }
        }
        // Single-column keys participate in foreign-key fixup
        if let [key_property] = metadata.key.as_slice() {
            if let Some(new_value) = keys.get(key_property) {
                let old_value = entry
                    .original_value(key_property)
                    .cloned()
                    .unwrap_or(Value::Null);
                if !old_value.is_null() {
                    fixups.push(KeyFixup {
                        principal_type: metadata.entity_type.clone(),
                        old_value,
                        new_value: new_value.clone(),
                    });
                }
            }
        }
        let new_identity = manager.entry(id)?.resolve_identity();
        manager.rebind_identity(id, new_identity)?;
    }

    // Accept: the new baseline for inserts/updates, removal for deletes
    let mut persisted = 0;
    for id in ids {
        let entry = manager.entry_internal_mut(*id)?;
        match entry.state() {
            EntityState::Added | EntityState::Modified => {
                entry.accept();
                persisted += 1;
            }
            EntityState::Deleted => {
                manager.remove_entry(*id);
                persisted += 1;
            }
            EntityState::Detached | EntityState::Unchanged => {}
        }
    }

    // Fixup runs against the accepted baselines: a rewritten foreign key
    // is a pending change for the next detection pass and save, never a
    // value silently folded into this save's snapshot
    propagate_generated_keys(manager, &fixups);

    tracing::info!(
        component = module_path!(),
        op = "save_changes",
        event = schema::EVENT_END,
        entry_count = persisted,
    );
    Ok(persisted)
}

/// A principal's key rewrite, to be mirrored onto dependent foreign keys
struct KeyFixup {
    principal_type: String,
    old_value: Value,
    new_value: Value,
}

/// Opportunistic navigation fixup after key assignment
///
/// Rewrites the foreign-key property of every tracked dependent that
/// still holds the principal's pre-insert placeholder value, resolved
/// through navigation metadata rather than object references. Rewrites
/// land after acceptance, as ordinary pending changes: the next change
/// detection pass promotes the dependent and the next save pushes the
/// new key value to the store.
fn propagate_generated_keys(manager: &mut StateManager, fixups: &[KeyFixup]) {
    if fixups.is_empty() {
        return;
    }
    for entry in manager.entries_internal_mut() {
        let navigations = entry.metadata().navigations.clone();
        for navigation in navigations {
            for fixup in fixups {
                if navigation.target != fixup.principal_type {
                    continue;
                }
                let current = entry.entity().get_value(&navigation.foreign_key);
                if current == Some(fixup.old_value.clone()) {
                    if entry
                        .entity_mut()
                        .set_value(&navigation.foreign_key, fixup.new_value.clone())
                    {
                        tracing::debug!(
                            entity_type = entry.entity_type(),
                            foreign_key = %navigation.foreign_key,
                            "navigation fixup applied"
                        );
                    } else {
                        tracing::warn!(
                            entity_type = entry.entity_type(),
                            foreign_key = %navigation.foreign_key,
                            "shape rejected navigation fixup write"
                        );
                    }
                }
            }
        }
    }
}

fn log_save_start(entry_count: usize) {
    tracing::info!(
        component = module_path!(),
        op = "save_changes",
        event = schema::EVENT_START,
        entry_count,
    );
}

fn log_save_error(err: &BurrowError) {
    tracing::error!(
        component = module_path!(),
        op = "save_changes",
        event = schema::EVENT_END_ERROR,
        err = %err,
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::{EntityAccess, EntityMetadata, PropertyMeta, Record};
    use burrow_core_types::Value;

    use super::*;

    /// Driver double that records the batches it receives
    #[derive(Debug, Default)]
    struct RecordingDriver {
        batches: Vec<Vec<SaveRequest>>,
    }

    impl StoreDriver for RecordingDriver {
        fn save(&mut self, batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
            self.batches.push(batch.to_vec());
            Ok(batch.iter().map(|_| SaveOutcome::Applied).collect())
        }
    }

    fn order_meta() -> Arc<EntityMetadata> {
        Arc::new(EntityMetadata::new(
            "Order",
            vec![
                PropertyMeta::generated_key("id"),
                PropertyMeta::new("total"),
                PropertyMeta::new("note"),
            ],
        ))
    }

    #[test]
    fn test_added_request_omits_unset_generated_key() {
        let mut mgr = StateManager::new();
        mgr.add(order_meta(), Box::new(Record::new().with("total", 5i64)))
            .unwrap();

        let mut driver = RecordingDriver::default();
        save_changes(&mut mgr, &mut driver).unwrap();

        let request = &driver.batches[0][0];
        assert_eq!(request.state, EntityState::Added);
        assert!(request.identity.is_none());
        assert!(!request.values.contains_key("id"));
        assert_eq!(request.values.get("total"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_modified_request_carries_only_changed_values() {
        let mut mgr = StateManager::new();
        let id = mgr
            .attach(
                order_meta(),
                Box::new(
                    Record::new()
                        .with("id", 1i64)
                        .with("total", 5i64)
                        .with("note", "x"),
                ),
            )
            .unwrap();
        mgr.entry_mut(id)
            .unwrap()
            .entity_mut()
            .set_value("total", Value::Int(6));

        let mut driver = RecordingDriver::default();
        save_changes(&mut mgr, &mut driver).unwrap();

        let request = &driver.batches[0][0];
        assert_eq!(request.state, EntityState::Modified);
        assert_eq!(request.changed, vec!["total".to_string()]);
        assert_eq!(request.values.len(), 1);
        assert_eq!(request.values.get("total"), Some(&Value::Int(6)));
    }

    #[test]
    fn test_deleted_request_carries_key_values() {
        let mut mgr = StateManager::new();
        let id = mgr
            .attach(
                order_meta(),
                Box::new(Record::new().with("id", 9i64).with("total", 5i64)),
            )
            .unwrap();
        mgr.delete(id).unwrap();

        let mut driver = RecordingDriver::default();
        save_changes(&mut mgr, &mut driver).unwrap();

        let request = &driver.batches[0][0];
        assert_eq!(request.state, EntityState::Deleted);
        assert_eq!(request.values.len(), 1);
        assert_eq!(request.values.get("id"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_nothing_pending_never_calls_driver() {
        let mut mgr = StateManager::new();
        mgr.attach(
            order_meta(),
            Box::new(Record::new().with("id", 1i64).with("total", 5i64)),
        )
        .unwrap();

        let mut driver = RecordingDriver::default();
        let count = save_changes(&mut mgr, &mut driver).unwrap();
        assert_eq!(count, 0);
        assert!(driver.batches.is_empty());
    }

    #[test]
    fn test_key_write_back_to_rejecting_shape_fails_with_unknown_property() {
        /// Shape holding only a total; rejects every other property write
        #[derive(Debug)]
        struct TotalOnly {
            total: i64,
        }
        impl EntityAccess for TotalOnly {
            fn get_value(&self, property: &str) -> Option<Value> {
                (property == "total").then(|| Value::Int(self.total))
            }
            fn set_value(&mut self, property: &str, value: Value) -> bool {
                if property != "total" {
                    return false;
                }
                match value {
                    Value::Int(v) => {
                        self.total = v;
                        true
                    }
                    _ => false,
                }
            }
        }

        struct KeyAssigningDriver;
        impl StoreDriver for KeyAssigningDriver {
            fn save(&mut self, batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
                Ok(batch
                    .iter()
                    .map(|_| SaveOutcome::AppliedWithKeys {
                        keys: [("id".to_string(), Value::Int(1))].into(),
                    })
                    .collect())
            }
        }

        let mut mgr = StateManager::new();
        let id = mgr
            .add(order_meta(), Box::new(TotalOnly { total: 5 }))
            .unwrap();

        let err = save_changes(&mut mgr, &mut KeyAssigningDriver).unwrap_err();
        assert_eq!(
            err,
            BurrowError::UnknownProperty {
                entity_type: "Order".to_string(),
                property: "id".to_string(),
            }
        );
        // The entry was not accepted
        assert_eq!(mgr.entry(id).unwrap().state(), EntityState::Added);
    }

    #[test]
    fn test_malformed_driver_reply_is_a_contract_failure() {
        struct ShortReplyDriver;
        impl StoreDriver for ShortReplyDriver {
            fn save(&mut self, _batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
                Ok(Vec::new())
            }
        }

        let mut mgr = StateManager::new();
        let id = mgr
            .add(order_meta(), Box::new(Record::new().with("total", 5i64)))
            .unwrap();

        let err = save_changes(&mut mgr, &mut ShortReplyDriver).unwrap_err();
        assert!(matches!(err, BurrowError::SaveFailed { .. }));
        // No acceptance happened
        assert_eq!(mgr.entry(id).unwrap().state(), EntityState::Added);
    }
}
