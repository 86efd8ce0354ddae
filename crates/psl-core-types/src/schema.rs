//! Canonical schema constants for structured logging
//!
//! The logging macros and the test capture layer agree on these names.

// Canonical field keys
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_WALK_ID: &str = "walk_id";

// Automaton identifiers
pub const FIELD_REGISTER: &str = "register";
pub const FIELD_STATE: &str = "state";
pub const FIELD_NODE: &str = "node";
pub const FIELD_HOOK: &str = "hook";
pub const FIELD_NAMED_EVENT: &str = "named_event";

// Collection sizes
pub const FIELD_BLOCK_COUNT: &str = "block_count";
pub const FIELD_STATE_COUNT: &str = "state_count";
pub const FIELD_LIVING_COUNT: &str = "living_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_WALK_ID.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_error_fields_are_namespaced() {
        assert!(FIELD_ERR_KIND.starts_with("err."));
        assert!(FIELD_ERR_CODE.starts_with("err."));
    }
}
