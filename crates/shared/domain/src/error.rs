//! Domain-level errors.
//!
//! Raised by schema checks, password handling and record decoding. Storage
//! outcomes (missing records, unique clashes) are reported by the collections
//! themselves through `AppError`.

use thiserror::Error;

/// Errors raised before anything reaches storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A payload, patch, filter or key broke a schema rule
    #[error("Validation error: {0}")]
    Validation(String),

    /// Password shorter than the minimum length
    #[error("Password error: {0}")]
    Password(String),

    /// Hashing failure or a stored record that no longer fits its entity
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
