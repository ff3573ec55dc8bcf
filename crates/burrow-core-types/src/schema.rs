//! Canonical event names for structured logging
//!
//! Log field keys are the literal identifiers in the `tracing` macro
//! calls; the event values are shared as constants so start/end pairs
//! stay consistent across operations.

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
