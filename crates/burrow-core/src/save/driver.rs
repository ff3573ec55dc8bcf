use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use burrow_core_types::{CancelToken, IdentityValue, Value};

use crate::errors::Result;
use crate::tracking::EntityState;

/// One pending entry, shaped for the store driver
///
/// `values` carries every scalar property for `Added` (minus unset
/// store-generated keys), only the changed properties for `Modified`
/// (partial update), and the key values for `Deleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub entity_type: String,
    pub state: EntityState,
    /// Identity at submission time; `None` for inserts with a pending
    /// store-generated key
    pub identity: Option<IdentityValue>,
    /// Ordered key property names of the entity type
    pub key: Vec<String>,
    pub values: BTreeMap<String, Value>,
    /// Changed property names for `Modified` requests
    pub changed: Vec<String>,
}

/// Driver verdict for one save request, in batch order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SaveOutcome {
    /// The operation was applied
    Applied,
    /// An insert was applied and the store generated key values
    AppliedWithKeys { keys: BTreeMap<String, Value> },
    /// The operation was not applied
    Rejected { reason: String },
}

/// Store driver contract, synchronous form
///
/// The driver receives the whole batch and returns exactly one outcome
/// per request, preserving batch order. Grouping and dependency ordering
/// beyond the deterministic submission order (inserts before deletes,
/// foreign-key topology) are the driver's responsibility.
pub trait StoreDriver {
    /// Execute a batch of save requests against the backing store
    ///
    /// # Errors
    /// Transport or store-level failure; per-entry rejections are
    /// reported through [`SaveOutcome::Rejected`] instead.
    fn save(&mut self, batch: &[SaveRequest]) -> Result<Vec<SaveOutcome>>;
}

/// Store driver contract, asynchronous cancellable form
///
/// Identical semantics to [`StoreDriver`]; the token is the cooperative
/// cancellation signal, honored mid-flight on a best-effort basis.
#[async_trait]
pub trait AsyncStoreDriver: Send {
    /// Execute a batch of save requests against the backing store
    ///
    /// # Errors
    /// Transport or store-level failure, or observed cancellation.
    async fn save(
        &mut self,
        batch: &[SaveRequest],
        cancel: &CancelToken,
    ) -> Result<Vec<SaveOutcome>>;
}
