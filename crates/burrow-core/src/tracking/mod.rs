//! Entry lifecycle, identity map, and change detection
//!
//! A `StateManager` is one unit of work: it owns the arena of tracked
//! entries, guarantees one entry per logical identity, and runs the
//! change-detection pass that promotes edited entries to `Modified`.
//! It is single-caller by design; independent managers are fully
//! concurrent with no shared mutable state.

pub mod detector;
pub mod entry;
pub mod state;
pub mod state_manager;

pub use entry::Entry;
pub use state::EntityState;
pub use state_manager::StateManager;
