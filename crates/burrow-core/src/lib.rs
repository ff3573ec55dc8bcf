//! Burrow Core - change tracking and save orchestration
//!
//! This crate provides the unit-of-work core of the Burrow persistence
//! layer, including:
//! - Entity metadata and the accessor capability for arbitrary entity shapes
//! - Convention-based key discovery with a configurable tie-break policy
//! - The entry lifecycle state machine (Detached/Unchanged/Added/Modified/Deleted)
//! - The identity-map state manager (one entry per logical identity)
//! - The change detector (original-snapshot vs. current-value comparison)
//! - The save pipeline with sync and async cancellable variants
//!
//! Concrete store drivers and query surfaces live outside this crate; the
//! core talks to them through the narrow [`save::StoreDriver`] /
//! [`save::AsyncStoreDriver`] traits.

pub mod errors;
pub mod logging;
pub mod model;
pub mod save;
pub mod tracking;

// Re-export commonly used types
pub use errors::{BurrowError, Result};
pub use model::{
    discover_key, EntityAccess, EntityMetadata, KeyDiscoveryOptions, NavigationMeta,
    PropertyMeta, Record,
};
pub use save::{
    save_changes, save_changes_async, AsyncStoreDriver, SaveOutcome, SaveRequest, StoreDriver,
};
pub use tracking::{EntityState, Entry, StateManager};
