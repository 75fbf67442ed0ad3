use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of an entity.
///
/// Identifiers are assigned once, either supplied by the caller or generated
/// as a UUID v4, and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Generates a fresh, globally unique identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Creates an identifier from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier holds no characters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_creates_unique_ids() {
        let id1 = Identifier::generate();
        let id2 = Identifier::generate();
        assert_ne!(id1, id2);
        assert!(!id1.is_empty());
    }

    #[test]
    fn generated_ids_are_uuids() {
        let id = Identifier::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = Identifier::from_uuid(uuid);
        assert_eq!(id.as_str(), uuid.to_string());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Identifier::new("user-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-1\"");
        let deserialized: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
