//! Engine-level error taxonomy.

use thiserror::Error;

use crewflow_core::DomainError;

use crate::store::StoreError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error surface of every public engine operation.
///
/// Kinds are preserved end-to-end so a caller can map them to distinct
/// responses: a `Conflict` (illegal transition, stale client view) must stay
/// distinguishable from `NotFound` and from `Validation`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced entity missing within the tenant's scope.
    #[error("not found")]
    NotFound,

    /// Malformed input (bad schedule, bad line items, unknown status name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation incompatible with the entity's current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Tenant context missing or unresolved (collaborator concern surfaced
    /// through the engine's entry points).
    #[error("unauthorized")]
    Unauthorized,

    /// The caller's cancellation signal fired before commit; nothing was
    /// persisted.
    #[error("operation cancelled")]
    Cancelled,

    /// The transactional store failed.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
            DomainError::NotFound => EngineError::NotFound,
            DomainError::Unauthorized => EngineError::Unauthorized,
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
        }
    }
}
