//! Core types shared across Burrow facilities
//!
//! This crate provides foundational types used by the tracking core,
//! store drivers, and logging:
//!
//! - **Value model**: scalar `Value` with value-equality semantics
//! - **Identity types**: `KeyComponent`, `IdentityValue`, `EntryId`
//! - **Cancellation**: cooperative `CancelToken` for the async save path
//! - **Schema constants**: canonical event names for structured logging

pub mod cancel;
pub mod ids;
pub mod key;
pub mod schema;
pub mod value;

pub use cancel::CancelToken;
pub use ids::EntryId;
pub use key::{IdentityValue, KeyComponent};
pub use value::Value;
