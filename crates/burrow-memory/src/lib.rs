//! Burrow Memory - reference in-memory store driver
//!
//! A HashMap-backed implementation of the store driver contract: one row
//! table per entity type keyed by identity, with monotonic sequences for
//! store-generated keys. Batches apply atomically - a batch containing
//! any rejected request leaves the store untouched.
//!
//! Useful as the test backend for the tracking core and as the template
//! for real drivers.

pub mod store;

pub use store::MemoryStore;
