//! Record identifiers
//!
//! Entity identifiers use UUIDv7, which is time-sortable: listing by
//! identifier follows creation order, which plays well with paginated reads
//! and log correlation.
//!
//! Validation is deliberately wider than generation: [`EntityId::is_valid`]
//! accepts any RFC 4122 UUID text, so externally minted v4 (random)
//! identifiers already present in a collection keep working.
//!
//! # Example
//!
//! ```rust
//! use crud_mapper::ids::EntityId;
//!
//! let id = EntityId::new();
//! assert!(EntityId::is_valid(id.as_str()));
//! assert!(EntityId::is_valid("cfbeb8b6-dfce-4c33-a9de-acb715e82388"));
//! assert!(!EntityId::is_valid("not-a-uuid"));
//! ```

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// A globally unique, creation-order-sortable record identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a fresh identifier (UUIDv7, hyphenated lowercase).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().hyphenated().to_string())
    }

    /// Whether the string could have been produced by this generator or by a
    /// standard random UUID generator.
    #[must_use]
    pub fn is_valid(value: &str) -> bool {
        Uuid::parse_str(value).is_ok()
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(|_| Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert!(EntityId::is_valid(a.as_str()));
        assert!(EntityId::is_valid(b.as_str()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_ids_sort_by_creation_order() {
        let earlier = EntityId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = EntityId::new();
        assert!(earlier < later);
    }

    #[test]
    fn test_accepts_random_v4_identifiers() {
        assert!(EntityId::is_valid("cfbeb8b6-dfce-4c33-a9de-acb715e82388"));
        assert!(EntityId::is_valid("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_rejects_malformed_identifiers() {
        assert!(!EntityId::is_valid(""));
        assert!(!EntityId::is_valid("not-a-uuid"));
        assert!(!EntityId::is_valid("cfbeb8b6-dfce-4c33-a9de"));
    }

    #[test]
    fn test_from_str_round_trip() {
        let id = EntityId::new();
        let parsed: EntityId = id.as_str().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("garbage".parse::<EntityId>().is_err());
    }
}
