//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures. The kinds map
/// one-to-one onto caller-visible outcomes (bad request, conflict, not found,
/// forbidden) and must never be coerced into one another: an illegal
/// transition is a conflict, not a validation failure, because it tells the
/// caller their view of the entity is stale.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, bad schedule).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is incompatible with the entity's current state
    /// (illegal transition, mutating a non-draft aggregate).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A requested resource was not found within the tenant's scope.
    #[error("not found")]
    NotFound,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Authorization failure at the domain boundary (tenant unresolved).
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
