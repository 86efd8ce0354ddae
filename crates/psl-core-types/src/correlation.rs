//! Correlation identifiers
//!
//! A living context is created once per tree walk. Its `WalkId` is attached
//! to every transition, hook and event log line so interleaved walks can be
//! told apart in aggregated output.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single tree walk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalkId(String);

impl WalkId {
    /// Generate a new WalkId using UUIDv7 (time ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization or replay)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for WalkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WalkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_id_generation() {
        let id1 = WalkId::new();
        let id2 = WalkId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_walk_id_display() {
        let id = WalkId::from_string("walk-1".to_string());
        assert_eq!(format!("{}", id), "walk-1");
    }

    #[test]
    fn test_serialization() {
        let id = WalkId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: WalkId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
