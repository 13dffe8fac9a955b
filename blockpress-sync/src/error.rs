use blockpress_core::ValidationError;
use blockpress_types::DocId;
use thiserror::Error;

/// Failures surfaced by a [`crate::DocumentStore`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(DocId),

    /// Malformed input; retrying the same request will fail again
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Network or server trouble; the request may succeed later
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Whether the same request might succeed if sent again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Transient(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
