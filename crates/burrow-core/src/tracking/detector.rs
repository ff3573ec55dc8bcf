//! Change detection pass
//!
//! Compares every detectable entry's current property values against its
//! original snapshot using value equality and promotes or demotes states
//! accordingly. The pass is synchronous, single-threaded, and never talks
//! to the store. It runs automatically before every save and on mutable
//! entry lookups unless the manager has auto-detection disabled.

use crate::tracking::state_manager::StateManager;

/// Run change detection over every entry in a detectable state
///
/// Entries with at least one differing property end up `Modified` with
/// their changed-property set recomputed to exactly the differing
/// properties (idempotent if already `Modified`); entries with no
/// differences remain or return to `Unchanged`.
///
/// Returns the number of entries ending up `Modified`.
pub fn detect_changes(manager: &mut StateManager) -> usize {
    let mut modified = 0;
    let mut inspected = 0;
    for entry in manager.entries_internal_mut() {
        if !entry.state().is_detectable() {
            continue;
        }
        inspected += 1;
        if entry.detect() {
            modified += 1;
        }
    }
    tracing::debug!(
        entry_count = inspected,
        modified_count = modified,
        "change detection pass"
    );
    modified
}
