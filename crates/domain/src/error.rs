//! Domain error types.

use common::Exception;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code used when several validation errors are reported together.
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", field_message(.field.as_deref(), .message))]
pub struct ValidationError {
    /// Stable error code (e.g. `INVALID_NON_EMPTY_STRING`).
    pub code: String,

    /// Human-readable description.
    pub message: String,

    /// Dot-separated path of the offending field, if the error belongs to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    /// Creates an error that is not yet attached to a field.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    /// Attaches the error to `field`, prefixing any nested path already present.
    pub fn at(mut self, field: &str) -> Self {
        self.field = Some(match self.field.take() {
            Some(inner) => format!("{field}.{inner}"),
            None => field.to_string(),
        });
        self
    }
}

fn field_message(field: Option<&str>, message: &str) -> String {
    match field {
        Some(field) => format!("{field}: {message}"),
        None => message.to_string(),
    }
}

impl Exception for ValidationError {
    fn code(&self) -> &str {
        &self.code
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

/// A non-empty collection of validation errors.
///
/// This is the failure channel of every parser: struct parsing reports every
/// violated field at once rather than stopping at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", joined(.0))]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

fn joined(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// Creates a collection holding a single error.
    pub fn new(error: ValidationError) -> Self {
        Self(vec![error])
    }

    /// Shorthand for a single error built from a code and message.
    pub fn single(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationError::new(code, message))
    }

    /// Builds a collection from a list, returning `None` when the list is empty.
    pub fn from_vec(errors: Vec<ValidationError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    /// Attaches every error to `field`.
    pub fn at(self, field: &str) -> Self {
        Self(self.0.into_iter().map(|e| e.at(field)).collect())
    }

    /// Appends the errors of another collection.
    pub fn merge(mut self, other: ValidationErrors) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Returns the first error.
    pub fn first(&self) -> &ValidationError {
        &self.0[0]
    }

    /// Returns an iterator over the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is never empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if any error carries `code`.
    pub fn contains_code(&self, code: &str) -> bool {
        self.0.iter().any(|e| e.code == code)
    }

    /// Returns the errors reported against `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.0
            .iter()
            .filter(move |e| e.field.as_deref() == Some(field))
    }

    /// Consumes the collection, returning the underlying list.
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl Exception for ValidationErrors {
    fn code(&self) -> &str {
        match self.0.as_slice() {
            [only] => &only.code,
            _ => VALIDATION_FAILED,
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self::new(error)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A business-rule violation raised by a command reducer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct CoreException {
    /// Stable error code.
    pub code: String,

    /// Human-readable description.
    pub message: String,
}

impl CoreException {
    /// Creates a new exception.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Exception for CoreException {
    fn code(&self) -> &str {
        &self.code
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

/// Lets reducers validate their input with `?`.
impl From<ValidationErrors> for CoreException {
    fn from(errors: ValidationErrors) -> Self {
        Self {
            code: errors.code().to_string(),
            message: errors.to_string(),
        }
    }
}
