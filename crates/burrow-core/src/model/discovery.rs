//! Convention-based key discovery
//!
//! Single-property keys can be discovered from property names instead of
//! being declared: a property named exactly `id`, or named after the
//! entity type (`order_id` / `OrderId` for an `Order`), is a key
//! candidate. Composite keys are always declared explicitly.

use crate::errors::{BurrowError, Result};

/// Options controlling the key discovery convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDiscoveryOptions {
    /// When both an exact `id` property and a type-prefixed one exist,
    /// prefer the exact suffix. With this disabled, simultaneous
    /// candidates are reported as ambiguous.
    pub prefer_exact_suffix: bool,
}

impl Default for KeyDiscoveryOptions {
    fn default() -> Self {
        Self {
            prefer_exact_suffix: true,
        }
    }
}

/// Discover the key property of an entity type by naming convention
///
/// Candidates, matched case-insensitively against `property_names` in
/// declaration order:
/// - the exact suffix form `id`
/// - the type-prefixed forms `{entity_type}id` and `{entity_type}_id`
///
/// # Errors
/// * `AmbiguousKey` - more than one candidate where exactly one is
///   expected, naming the offending entity type and all candidates
/// * `MissingKey` - no candidate found
pub fn discover_key(
    entity_type: &str,
    property_names: &[&str],
    options: &KeyDiscoveryOptions,
) -> Result<Vec<String>> {
    let type_lower = entity_type.to_ascii_lowercase();
    let prefixed_plain = format!("{}id", type_lower);
    let prefixed_snake = format!("{}_id", type_lower);

    let mut exact: Vec<&str> = Vec::new();
    let mut prefixed: Vec<&str> = Vec::new();
    for name in property_names {
        let lower = name.to_ascii_lowercase();
        if lower == "id" {
            exact.push(name);
        } else if lower == prefixed_plain || lower == prefixed_snake {
            prefixed.push(name);
        }
    }

    let ambiguous = |candidates: Vec<&str>| BurrowError::AmbiguousKey {
        entity_type: entity_type.to_string(),
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    };

    match (exact.len(), prefixed.len()) {
        (0, 0) => Err(BurrowError::MissingKey {
            entity_type: entity_type.to_string(),
        }),
        (1, 0) => Ok(vec![exact[0].to_string()]),
        (0, 1) => Ok(vec![prefixed[0].to_string()]),
        (1, _) if options.prefer_exact_suffix => Ok(vec![exact[0].to_string()]),
        _ => {
            let mut candidates = exact;
            candidates.extend(prefixed);
            Err(ambiguous(candidates))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_suffix_found() {
        let key = discover_key("Order", &["id", "total"], &KeyDiscoveryOptions::default())
            .unwrap();
        assert_eq!(key, vec!["id"]);
    }

    #[test]
    fn test_type_prefixed_found() {
        let key = discover_key(
            "Order",
            &["order_id", "total"],
            &KeyDiscoveryOptions::default(),
        )
        .unwrap();
        assert_eq!(key, vec!["order_id"]);

        let key = discover_key("Order", &["OrderId"], &KeyDiscoveryOptions::default()).unwrap();
        assert_eq!(key, vec!["OrderId"]);
    }

    #[test]
    fn test_exact_suffix_wins_when_both_exist() {
        let key = discover_key(
            "Order",
            &["order_id", "id"],
            &KeyDiscoveryOptions::default(),
        )
        .unwrap();
        assert_eq!(key, vec!["id"]);
    }

    #[test]
    fn test_simultaneous_candidates_ambiguous_when_policy_disabled() {
        let options = KeyDiscoveryOptions {
            prefer_exact_suffix: false,
        };
        let err = discover_key("Order", &["id", "order_id"], &options).unwrap_err();
        match err {
            BurrowError::AmbiguousKey {
                entity_type,
                candidates,
            } => {
                assert_eq!(entity_type, "Order");
                assert_eq!(candidates, vec!["id", "order_id"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_two_prefixed_candidates_ambiguous() {
        let err = discover_key(
            "Order",
            &["order_id", "OrderId"],
            &KeyDiscoveryOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BurrowError::AmbiguousKey { .. }));
    }

    #[test]
    fn test_no_candidate_missing_key() {
        let err = discover_key("Order", &["total", "placed_at"], &KeyDiscoveryOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            BurrowError::MissingKey {
                entity_type: "Order".to_string(),
            }
        );
    }
}
