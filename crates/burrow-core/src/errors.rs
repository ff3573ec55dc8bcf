use burrow_core_types::EntryId;
use thiserror::Error;

use crate::tracking::EntityState;

/// Result type alias using BurrowError
pub type Result<T> = std::result::Result<T, BurrowError>;

/// Comprehensive error taxonomy for Burrow tracking and save operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BurrowError {
    // ===== Identity Errors =====
    /// Identity already maps to a different tracked instance
    #[error("Identity {identity} of {entity_type} is already tracked by a different instance")]
    TrackingConflict {
        entity_type: String,
        identity: String,
    },

    /// Key discovery found more than one candidate key property
    #[error("Ambiguous key for entity type {entity_type}: candidates {candidates:?}")]
    AmbiguousKey {
        entity_type: String,
        candidates: Vec<String>,
    },

    /// Key discovery found no candidate key property
    #[error("No key property found for entity type {entity_type}")]
    MissingKey { entity_type: String },

    // ===== Tracking Errors =====
    /// Entry not found in the state manager
    #[error("Entry not found: {entry_id}")]
    EntryNotFound { entry_id: EntryId },

    /// Requested state transition is not allowed
    #[error("Invalid state transition for {entity_type}: {from} -> {to}")]
    InvalidTransition {
        entity_type: String,
        from: EntityState,
        to: EntityState,
    },

    /// Property is not declared on the entity type's metadata
    #[error("Unknown property {property} on entity type {entity_type}")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    /// A value could not be represented in the scalar value model
    #[error("Invalid value: {reason}")]
    InvalidValue { reason: String },

    // ===== Save Errors =====
    /// The store driver rejected an entry
    #[error("Store rejected {entity_type}: {reason}")]
    SaveRejected {
        entity_type: String,
        reason: String,
    },

    /// The store driver failed as a whole (transport or contract failure)
    #[error("Save failed: {reason}")]
    SaveFailed { reason: String },

    /// The asynchronous save observed cancellation before the store call
    #[error("Save cancelled before the store call started")]
    SaveCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = BurrowError::TrackingConflict {
            entity_type: "Order".to_string(),
            identity: "42".to_string(),
        };
        assert!(err.to_string().contains("Order"));
        assert!(err.to_string().contains("42"));

        let err = BurrowError::InvalidTransition {
            entity_type: "Order".to_string(),
            from: EntityState::Unchanged,
            to: EntityState::Added,
        };
        assert!(err.to_string().contains("Unchanged"));
        assert!(err.to_string().contains("Added"));
    }

    #[test]
    fn test_errors_are_comparable() {
        let a = BurrowError::SaveCancelled;
        let b = BurrowError::SaveCancelled;
        assert_eq!(a, b);
    }
}
