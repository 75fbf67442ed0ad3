use common::Exception;
use thiserror::Error;

/// Failure of the record-to-entity conversion.
pub const DOMAIN_MAPPING_FAILED: &str = "DOMAIN_MAPPING_FAILED";
/// Failure of the generated entity-to-record conversion.
pub const ORM_MAPPING_FAILED: &str = "ORM_MAPPING_FAILED";
/// Failure of a user-supplied entity-to-record conversion.
pub const TO_ORM_FAILED: &str = "TO_ORM_FAILED";
/// Failure to turn query params into a predicate.
pub const QUERY_MAPPING_FAILED: &str = "QUERY_MAPPING_FAILED";

/// Error type returned by mapper closures.
pub type MapperError = Box<dyn std::error::Error + Send + Sync>;

/// A mapping fault tagged with a stable code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct OperationException {
    pub code: String,
    pub message: String,
}

impl OperationException {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn domain_mapping(message: impl Into<String>) -> Self {
        Self::new(DOMAIN_MAPPING_FAILED, message)
    }

    pub fn orm_mapping(message: impl Into<String>) -> Self {
        Self::new(ORM_MAPPING_FAILED, message)
    }

    /// Tags an arbitrary mapper error with `code`.
    ///
    /// An error that already is an `OperationException` keeps its own code.
    pub fn retag(error: MapperError, code: &str) -> Self {
        match error.downcast::<OperationException>() {
            Ok(tagged) => *tagged,
            Err(other) => Self::new(code, other.to_string()),
        }
    }
}

impl Exception for OperationException {
    fn code(&self) -> &str {
        &self.code
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

/// Errors raised by record stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record has no string `id` field.
    #[error("Record in {collection} has no string id")]
    MissingId { collection: String },

    /// The configured table name is not a plain identifier.
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}

impl Exception for StoreError {
    fn code(&self) -> &str {
        match self {
            Self::Database(_) => "STORE_DATABASE_ERROR",
            Self::Serialization(_) => "STORE_SERIALIZATION_ERROR",
            Self::MissingId { .. } => "STORE_MISSING_ID",
            Self::InvalidTableName(_) => "STORE_INVALID_TABLE",
        }
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A mapper failed.
    #[error(transparent)]
    Mapping(#[from] OperationException),

    /// The underlying store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RepositoryError {
    /// Returns the mapping fault, if this is one.
    pub fn as_mapping(&self) -> Option<&OperationException> {
        match self {
            Self::Mapping(e) => Some(e),
            Self::Store(_) => None,
        }
    }
}

impl Exception for RepositoryError {
    fn code(&self) -> &str {
        match self {
            Self::Mapping(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retag_wraps_foreign_errors() {
        let error: MapperError = "boom".into();
        let tagged = OperationException::retag(error, TO_ORM_FAILED);
        assert_eq!(tagged.code, TO_ORM_FAILED);
        assert_eq!(tagged.message, "boom");
    }

    #[test]
    fn retag_keeps_existing_code() {
        let error: MapperError = Box::new(OperationException::new("CUSTOM", "kept"));
        let tagged = OperationException::retag(error, DOMAIN_MAPPING_FAILED);
        assert_eq!(tagged, OperationException::new("CUSTOM", "kept"));
    }

    #[test]
    fn repository_error_exposes_mapping_code() {
        let error = RepositoryError::from(OperationException::orm_mapping("bad"));
        assert_eq!(error.code(), ORM_MAPPING_FAILED);
        assert_eq!(error.to_string(), "ORM_MAPPING_FAILED: bad");

        let error = RepositoryError::from(StoreError::MissingId {
            collection: "users".into(),
        });
        assert_eq!(error.code(), "STORE_MISSING_ID");
        assert!(error.as_mapping().is_none());
    }
}
