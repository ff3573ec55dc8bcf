use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use burrow_core::errors::{BurrowError, Result};
use burrow_core::save::{AsyncStoreDriver, SaveOutcome, SaveRequest, StoreDriver};
use burrow_core::tracking::EntityState;
use burrow_core_types::{CancelToken, IdentityValue, Value};

type Row = BTreeMap<String, Value>;
type Table = HashMap<IdentityValue, Row>;

/// In-memory store driver
///
/// Single-threaded like the unit of work that owns it. All storage access
/// is encapsulated here so a real driver can replace it wholesale.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Row tables, one per entity type, keyed by identity
    tables: HashMap<String, Table>,
    /// Monotonic key sequence per entity type
    sequences: HashMap<String, i64>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a stored row
    pub fn row(&self, entity_type: &str, identity: &IdentityValue) -> Option<&Row> {
        self.tables.get(entity_type)?.get(identity)
    }

    /// Number of rows stored for an entity type
    pub fn table_len(&self, entity_type: &str) -> usize {
        self.tables.get(entity_type).map_or(0, Table::len)
    }

    /// Apply one request against staged state
    fn apply_one(
        tables: &mut HashMap<String, Table>,
        sequences: &mut HashMap<String, i64>,
        request: &SaveRequest,
    ) -> SaveOutcome {
        match request.state {
            EntityState::Added => Self::apply_insert(tables, sequences, request),
            EntityState::Modified => Self::apply_update(tables, request),
            EntityState::Deleted => Self::apply_delete(tables, request),
            other => SaveOutcome::Rejected {
                reason: format!("unexpected state in batch: {}", other),
            },
        }
    }

    fn apply_insert(
        tables: &mut HashMap<String, Table>,
        sequences: &mut HashMap<String, i64>,
        request: &SaveRequest,
    ) -> SaveOutcome {
        let mut row = request.values.clone();
        let mut generated: BTreeMap<String, Value> = BTreeMap::new();

        // Assign missing key values from the per-type sequence
        for key_property in &request.key {
            let missing = row.get(key_property).is_none_or(Value::is_null);
            if missing {
                let sequence = sequences.entry(request.entity_type.clone()).or_insert(0);
                *sequence += 1;
                let value = Value::Int(*sequence);
                row.insert(key_property.clone(), value.clone());
                generated.insert(key_property.clone(), value);
            }
        }

        let key_values: Vec<Value> = request
            .key
            .iter()
            .map(|name| row.get(name).cloned().unwrap_or(Value::Null))
            .collect();
        let Some(identity) = IdentityValue::from_values(&key_values) else {
            return SaveOutcome::Rejected {
                reason: "insert key is not resolvable".to_string(),
            };
        };

        let table = tables.entry(request.entity_type.clone()).or_default();
        if table.contains_key(&identity) {
            return SaveOutcome::Rejected {
                reason: format!("duplicate key {}", identity),
            };
        }
        table.insert(identity, row);

        if generated.is_empty() {
            SaveOutcome::Applied
        } else {
            SaveOutcome::AppliedWithKeys { keys: generated }
        }
    }

    fn apply_update(tables: &mut HashMap<String, Table>, request: &SaveRequest) -> SaveOutcome {
        let Some(identity) = &request.identity else {
            return SaveOutcome::Rejected {
                reason: "update without identity".to_string(),
            };
        };
        let row = tables
            .get_mut(&request.entity_type)
            .and_then(|table| table.get_mut(identity));
        let Some(row) = row else {
            return SaveOutcome::Rejected {
                reason: format!("row not found: {}", identity),
            };
        };
        // Partial update: only the changed columns arrive
        for (name, value) in &request.values {
            row.insert(name.clone(), value.clone());
        }
        SaveOutcome::Applied
    }

    fn apply_delete(tables: &mut HashMap<String, Table>, request: &SaveRequest) -> SaveOutcome {
        let Some(identity) = &request.identity else {
            return SaveOutcome::Rejected {
                reason: "delete without identity".to_string(),
            };
        };
        let removed = tables
            .get_mut(&request.entity_type)
            .and_then(|table| table.remove(identity));
        if removed.is_none() {
            return SaveOutcome::Rejected {
                reason: format!("row not found: {}", identity),
            };
        }
        SaveOutcome::Applied
    }
}

impl StoreDriver for MemoryStore {
    fn save(&mut self, batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>> {
        // Stage the whole batch; commit only when nothing was rejected
        let mut tables = self.tables.clone();
        let mut sequences = self.sequences.clone();

        let outcomes: Vec<SaveOutcome> = batch
            .iter()
            .map(|request| Self::apply_one(&mut tables, &mut sequences, request))
            .collect();

        let rejected = outcomes
            .iter()
            .any(|o| matches!(o, SaveOutcome::Rejected { .. }));
        if !rejected {
            self.tables = tables;
            self.sequences = sequences;
        }
        tracing::debug!(
            batch_len = batch.len(),
            rejected,
            "memory store batch applied"
        );
        Ok(outcomes)
    }
}

#[async_trait]
impl AsyncStoreDriver for MemoryStore {
    async fn save(
        &mut self,
        batch: &[SaveRequest],
        cancel: &CancelToken,
    ) -> Result<Vec<SaveOutcome>> {
        // Best-effort cancellation check; there is no real I/O to abort
        if cancel.is_cancelled() {
            return Err(BurrowError::SaveCancelled);
        }
        StoreDriver::save(self, batch)
    }
}
