use serde::{Deserialize, Serialize};

/// Lifecycle state of a tracked entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    /// Not tracked; never reachable from the identity map
    Detached,
    /// Tracked and in sync with the store
    Unchanged,
    /// Scheduled for insertion
    Added,
    /// Tracked with at least one property differing from the snapshot
    Modified,
    /// Scheduled for deletion
    Deleted,
}

impl EntityState {
    /// Whether a save must submit this entry to the store
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            EntityState::Added | EntityState::Modified | EntityState::Deleted
        )
    }

    /// Whether the change detector inspects this entry
    pub fn is_detectable(self) -> bool {
        matches!(self, EntityState::Unchanged | EntityState::Modified)
    }

    /// Whether the transition `self -> to` is part of the state machine
    ///
    /// The table is exhaustive; anything outside it is an illegal
    /// transition. Same-state requests are treated as no-ops by the
    /// state manager, not by this table.
    pub fn can_transition_to(self, to: EntityState) -> bool {
        use EntityState::*;
        matches!(
            (self, to),
            // registration
            (Detached, Added) | (Detached, Unchanged) | (Detached, Modified)
            // delete of a never-persisted entity downgrades, see state manager
            | (Added, Detached)
            // change detection / explicit mark
            | (Unchanged, Modified)
            // removal request
            | (Unchanged, Deleted) | (Modified, Deleted)
            // accept changes after a successful save
            | (Added, Unchanged) | (Modified, Unchanged) | (Deleted, Detached)
        )
    }

    /// Stable display name
    pub fn as_str(self) -> &'static str {
        match self {
            EntityState::Detached => "Detached",
            EntityState::Unchanged => "Unchanged",
            EntityState::Added => "Added",
            EntityState::Modified => "Modified",
            EntityState::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
