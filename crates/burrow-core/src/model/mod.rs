//! Entity metadata and accessor capability
//!
//! The tracking core is agnostic to concrete entity shapes: everything it
//! knows about an entity type comes from [`EntityMetadata`], and every
//! property read/write goes through the [`EntityAccess`] capability.
//! Metadata is built once, shared as `Arc`, and read-only afterwards.

pub mod access;
pub mod discovery;
pub mod metadata;

pub use access::{EntityAccess, Record};
pub use discovery::{discover_key, KeyDiscoveryOptions};
pub use metadata::{EntityMetadata, NavigationMeta, PropertyMeta};
