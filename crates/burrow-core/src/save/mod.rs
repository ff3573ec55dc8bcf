//! Save orchestration
//!
//! Turns pending entries into store operations: detect, collect, delegate
//! to the store driver, and accept successful changes back onto the
//! tracked entries. The driver is the one external collaborator and the
//! one suspension point of the async variant.

pub mod driver;
pub mod pipeline;

pub use driver::{AsyncStoreDriver, SaveOutcome, SaveRequest, StoreDriver};
pub use pipeline::{save_changes, save_changes_async};
