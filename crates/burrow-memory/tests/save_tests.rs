// Integration tests for the synchronous save pipeline against the
// in-memory store driver: acceptance, counts, no-partial-commit, key
// write-back, and navigation fixup.

use std::sync::Arc;

use burrow_core::errors::Result;
use burrow_core::{
    save_changes, BurrowError, EntityMetadata, EntityState, NavigationMeta, PropertyMeta,
    Record, SaveOutcome, SaveRequest, StateManager, StoreDriver,
};
use burrow_core_types::{IdentityValue, Value};
use burrow_memory::MemoryStore;

fn order_meta() -> Arc<EntityMetadata> {
    Arc::new(EntityMetadata::new(
        "Order",
        vec![PropertyMeta::key("id"), PropertyMeta::new("total")],
    ))
}

fn order(id: i64, total: i64) -> Box<Record> {
    Box::new(Record::new().with("id", id).with("total", total))
}

fn seeded(mgr: &mut StateManager, store: &mut MemoryStore, id: i64, total: i64) {
    let entry = mgr.attach(order_meta(), order(id, total)).unwrap();
    // Mirror the attached row into the store so updates/deletes resolve
    let batch = vec![SaveRequest {
        entity_type: "Order".to_string(),
        state: EntityState::Added,
        identity: mgr.entry(entry).unwrap().identity().cloned(),
        key: vec!["id".to_string()],
        values: [
            ("id".to_string(), Value::Int(id)),
            ("total".to_string(), Value::Int(total)),
        ]
        .into(),
        changed: Vec::new(),
    }];
    StoreDriver::save(store, &batch).unwrap();
}

// ---------------------------------------------------------------------------
// zero-op and counts
// ---------------------------------------------------------------------------

#[test]
fn test_save_with_nothing_pending_returns_zero_without_store_call() {
    /// Driver double that fails the test if contacted
    struct PanicDriver;
    impl StoreDriver for PanicDriver {
        fn save(&mut self, _batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
            panic!("store must not be contacted for a zero-op save");
        }
    }

    let mut mgr = StateManager::new();
    mgr.attach(order_meta(), order(1, 10)).unwrap();

    let count = save_changes(&mut mgr, &mut PanicDriver).unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_added_and_deleted_entries_save_with_count_two() {
    let mut mgr = StateManager::new();
    let mut store = MemoryStore::new();
    seeded(&mut mgr, &mut store, 1, 10);

    let added = mgr.add(order_meta(), order(2, 20)).unwrap();
    let doomed = mgr
        .entry_by_identity(
            "Order",
            &IdentityValue::from_values(&[Value::Int(1)]).unwrap(),
        )
        .unwrap();
    mgr.delete(doomed).unwrap();

    let count = save_changes(&mut mgr, &mut store).unwrap();
    assert_eq!(count, 2);

    // Added -> Unchanged, Deleted -> removed from tracking
    assert_eq!(mgr.entry(added).unwrap().state(), EntityState::Unchanged);
    assert!(mgr.entry(doomed).is_err());
    assert_eq!(store.table_len("Order"), 1);
}

#[test]
fn test_modified_entry_persists_partial_update() {
    let mut mgr = StateManager::new();
    let mut store = MemoryStore::new();
    seeded(&mut mgr, &mut store, 1, 10);

    let id = mgr
        .entry_by_identity(
            "Order",
            &IdentityValue::from_values(&[Value::Int(1)]).unwrap(),
        )
        .unwrap();
    mgr.entry_mut(id)
        .unwrap()
        .entity_mut()
        .set_value("total", Value::Int(25));

    let count = save_changes(&mut mgr, &mut store).unwrap();
    assert_eq!(count, 1);
    assert_eq!(mgr.entry(id).unwrap().state(), EntityState::Unchanged);

    let identity = IdentityValue::from_values(&[Value::Int(1)]).unwrap();
    let row = store.row("Order", &identity).unwrap();
    assert_eq!(row.get("total"), Some(&Value::Int(25)));
}

// ---------------------------------------------------------------------------
// failure: no partial acceptance
// ---------------------------------------------------------------------------

#[test]
fn test_one_rejection_leaves_all_entries_untouched() {
    /// Driver double rejecting the second request
    struct RejectSecond;
    impl StoreDriver for RejectSecond {
        fn save(&mut self, batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
            Ok(batch
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    if i == 1 {
                        SaveOutcome::Rejected {
                            reason: "constraint violation".to_string(),
                        }
                    } else {
                        SaveOutcome::Applied
                    }
                })
                .collect())
        }
    }

    let mut mgr = StateManager::new();
    let added = mgr.add(order_meta(), order(1, 10)).unwrap();
    let deleted = mgr.attach(order_meta(), order(2, 20)).unwrap();
    mgr.delete(deleted).unwrap();

    let err = save_changes(&mut mgr, &mut RejectSecond).unwrap_err();
    assert_eq!(
        err,
        BurrowError::SaveRejected {
            entity_type: "Order".to_string(),
            reason: "constraint violation".to_string(),
        }
    );

    // Both entries keep their pre-call states
    assert_eq!(mgr.entry(added).unwrap().state(), EntityState::Added);
    assert_eq!(mgr.entry(deleted).unwrap().state(), EntityState::Deleted);
}

#[test]
fn test_transport_failure_surfaces_without_acceptance() {
    struct BrokenPipe;
    impl StoreDriver for BrokenPipe {
        fn save(&mut self, _batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
            Err(BurrowError::SaveFailed {
                reason: "connection reset".to_string(),
            })
        }
    }

    let mut mgr = StateManager::new();
    let id = mgr.add(order_meta(), order(1, 10)).unwrap();

    let err = save_changes(&mut mgr, &mut BrokenPipe).unwrap_err();
    assert!(matches!(err, BurrowError::SaveFailed { .. }));
    assert_eq!(mgr.entry(id).unwrap().state(), EntityState::Added);
}

// ---------------------------------------------------------------------------
// generated keys & fixup
// ---------------------------------------------------------------------------

fn generated_order_meta() -> Arc<EntityMetadata> {
    Arc::new(EntityMetadata::new(
        "Order",
        vec![
            PropertyMeta::generated_key("id"),
            PropertyMeta::new("total"),
        ],
    ))
}

fn line_meta() -> Arc<EntityMetadata> {
    Arc::new(
        EntityMetadata::new(
            "OrderLine",
            vec![
                PropertyMeta::key("id"),
                PropertyMeta::new("order_id"),
                PropertyMeta::new("sku"),
            ],
        )
        .with_navigation(NavigationMeta {
            name: "order".to_string(),
            target: "Order".to_string(),
            foreign_key: "order_id".to_string(),
        }),
    )
}

#[test]
fn test_generated_key_written_back_and_identity_registered() {
    let mut mgr = StateManager::new();
    let mut store = MemoryStore::new();

    let id = mgr
        .add(
            generated_order_meta(),
            Box::new(Record::new().with("total", 10i64)),
        )
        .unwrap();
    assert!(mgr.entry(id).unwrap().identity().is_none());

    save_changes(&mut mgr, &mut store).unwrap();

    let entry = mgr.entry(id).unwrap();
    assert_eq!(entry.state(), EntityState::Unchanged);
    assert_eq!(entry.entity().get_value("id"), Some(Value::Int(1)));

    let identity = entry.identity().cloned().unwrap();
    assert_eq!(mgr.entry_by_identity("Order", &identity), Some(id));
    assert!(store.row("Order", &identity).is_some());
}

#[test]
fn test_fixup_rewrites_dependent_foreign_keys() {
    let mut mgr = StateManager::new();
    let mut store = MemoryStore::new();

    // Principal with a placeholder key; dependent referencing it
    let principal = mgr
        .add(
            generated_order_meta(),
            Box::new(Record::new().with("id", -1i64).with("total", 10i64)),
        )
        .unwrap();
    let dependent = mgr
        .add(
            line_meta(),
            Box::new(
                Record::new()
                    .with("id", 100i64)
                    .with("order_id", -1i64)
                    .with("sku", "widget"),
            ),
        )
        .unwrap();

    save_changes(&mut mgr, &mut store).unwrap();

    // Store assigned a real key; the dependent's FK follows it
    let new_key = mgr
        .entry(principal)
        .unwrap()
        .entity()
        .get_value("id")
        .unwrap();
    assert_ne!(new_key, Value::Int(-1));
    assert_eq!(
        mgr.entry(dependent).unwrap().entity().get_value("order_id"),
        Some(new_key)
    );
}

#[test]
fn test_fixup_converges_store_row_on_second_save() {
    let mut mgr = StateManager::new();
    let mut store = MemoryStore::new();

    mgr.add(
        generated_order_meta(),
        Box::new(Record::new().with("id", -1i64).with("total", 10i64)),
    )
    .unwrap();
    let dependent = mgr
        .add(
            line_meta(),
            Box::new(
                Record::new()
                    .with("id", 100i64)
                    .with("order_id", -1i64)
                    .with("sku", "widget"),
            ),
        )
        .unwrap();

    save_changes(&mut mgr, &mut store).unwrap();

    // The dependent row was inserted with the placeholder; the in-save
    // rewrite is a pending change against the fresh baseline, not part
    // of this save's snapshot
    let line_identity = IdentityValue::from_values(&[Value::Int(100)]).unwrap();
    assert_eq!(
        store.row("OrderLine", &line_identity).unwrap().get("order_id"),
        Some(&Value::Int(-1))
    );
    assert_eq!(mgr.detect_changes(), 1);

    let count = save_changes(&mut mgr, &mut store).unwrap();
    assert_eq!(count, 1);

    // Tracker and store agree on the assigned key
    let new_key = mgr
        .entry(dependent)
        .unwrap()
        .entity()
        .get_value("order_id")
        .unwrap();
    assert_ne!(new_key, Value::Int(-1));
    assert_eq!(
        store.row("OrderLine", &line_identity).unwrap().get("order_id"),
        Some(&new_key)
    );
    assert_eq!(mgr.entry(dependent).unwrap().state(), EntityState::Unchanged);
}
