//! Type-safe entity identifiers using the TypeID specification
//!
//! Every catalog record is addressed by an [`EntityId`]: a TypeID whose prefix names the
//! resource (`genre`, `author`, ...) and whose suffix is a base32-encoded UUIDv7. The v7 suffix
//! keeps ids time-sortable, so ids generated later compare greater.
//!
//! # Example
//!
//! ```rust
//! use catalog_store::ids::EntityId;
//! use std::str::FromStr;
//!
//! let id = EntityId::generate("genre");
//! assert_eq!(id.prefix(), "genre");
//!
//! let parsed = EntityId::from_str(id.as_str()).unwrap();
//! assert_eq!(parsed, id);
//! ```

use mti::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque, immutable identifier of a stored record.
///
/// # Format
///
/// `<prefix>_<base32-encoded-uuidv7>`, for example `genre_01h455vb4pex5vsknk084sn02q`.
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(MagicTypeId);

impl EntityId {
    /// Creates a new time-sortable id for the resource with the given prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(prefix.create_type_id::<V7>())
    }

    /// Parses an id and checks that it carries the expected prefix.
    ///
    /// # Example
    ///
    /// ```rust
    /// use catalog_store::ids::{EntityId, EntityIdError};
    ///
    /// let id = EntityId::generate("author");
    /// assert!(EntityId::parse_with_prefix(id.as_str(), "author").is_ok());
    /// assert!(matches!(
    ///     EntityId::parse_with_prefix(id.as_str(), "genre"),
    ///     Err(EntityIdError::InvalidPrefix { .. })
    /// ));
    /// ```
    pub fn parse_with_prefix(s: &str, expected: &str) -> Result<Self, EntityIdError> {
        let id = Self::from_str(s)?;
        if id.prefix() != expected {
            return Err(EntityIdError::InvalidPrefix {
                expected: expected.to_string(),
                actual: id.prefix().to_string(),
            });
        }
        Ok(id)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the prefix portion of the id.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.prefix().as_str()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mti = MagicTypeId::from_str(s).map_err(EntityIdError::Parse)?;
        if mti.prefix().as_str().is_empty() {
            return Err(EntityIdError::MissingPrefix);
        }
        Ok(Self(mti))
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0.to_string()
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// Error type for entity id parsing.
#[derive(Debug, thiserror::Error)]
pub enum EntityIdError {
    /// The id could not be parsed as a valid TypeID.
    #[error("failed to parse entity ID: {0}")]
    Parse(#[from] MagicTypeIdError),

    /// The id has no resource prefix.
    #[error("entity ID has no prefix")]
    MissingPrefix,

    /// The id belongs to a different resource type.
    #[error("invalid entity ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        /// The expected prefix
        expected: String,
        /// The actual prefix found
        actual: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_prefix() {
        let id = EntityId::generate("genre");
        assert!(id.as_str().starts_with("genre_"));
        assert_eq!(id.prefix(), "genre");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = EntityId::generate("genre");
        let b = EntityId::generate("genre");
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip_through_string() {
        let id = EntityId::generate("publisher");
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(EntityId::from_str("not an id").is_err());
    }

    #[test]
    fn test_parse_with_wrong_prefix() {
        let id = EntityId::generate("author");
        let err = EntityId::parse_with_prefix(id.as_str(), "genre").unwrap_err();
        assert!(err.to_string().contains("expected 'genre'"));
    }

    #[test]
    fn test_serde_as_string() {
        let id = EntityId::generate("genre");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));

        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
