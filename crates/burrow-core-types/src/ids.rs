//! Entry handles
//!
//! Entries live in an arena owned by the state manager and are addressed
//! by `EntryId` rather than by reference, so related entries can point at
//! each other through identity-map lookups instead of object cycles.

use serde::{Deserialize, Serialize};

/// Handle addressing one tracked entry within a state manager
///
/// Ids are assigned monotonically per state manager and are never reused,
/// including after an entry is detached and discarded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntryId(u64);

impl EntryId {
    /// Create from a raw id value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry:{}", self.0)
    }
}
