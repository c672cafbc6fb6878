//! # Engine Primitives
//!
//! Hardcoded constants for the nodewire engine. Compiled in, immutable at runtime.

/// Slot type labels that are compatible with every other type.
///
/// `"*"` is the editor's generic slot; `"ANY"` is the spelling several
/// custom node packs use. Callers may replace this list through
/// [`ResolverOptions`](crate::resolver::ResolverOptions).
pub const DEFAULT_WILDCARD_TYPES: &[&str] = &["*", "ANY"];

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a workflow JSON document accepted by the parser (64 MB).
///
/// Checked before deserialization so oversized input is rejected without
/// allocating for it.
pub const MAX_WORKFLOW_BYTES: usize = 64 * 1024 * 1024;

/// Maximum number of removals plus additions in a single batch.
pub const MAX_BATCH_OPERATIONS: usize = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_slot_is_a_wildcard() {
        assert!(DEFAULT_WILDCARD_TYPES.contains(&"*"));
    }

    #[test]
    fn limits_are_correct() {
        assert_eq!(MAX_WORKFLOW_BYTES, 67_108_864);
        assert_eq!(MAX_BATCH_OPERATIONS, 10_000);
    }
}
