//! Operation-boundary error model.

use thiserror::Error;

use procura_auth::AuthzError;
use procura_core::DomainError;

use crate::event_store::EventStoreError;

/// Caller-facing category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Unauthorized,
    Internal,
}

/// Failure of one engine operation.
///
/// Nothing is retried internally; every variant is surfaced synchronously.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A lifecycle invariant would be violated, or a concurrent write won the race.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Absent, or not owned by the caller (indistinguishable on purpose).
    #[error("not found")]
    NotFound,
    /// The caller lacks the capability the operation requires.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Failed to deserialize historical event payloads into the aggregate event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    /// The event store failed for a reason other than a version race.
    #[error(transparent)]
    Store(EventStoreError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Validation(_) => ErrorKind::Validation,
            DispatchError::Conflict(_) => ErrorKind::Conflict,
            DispatchError::NotFound => ErrorKind::NotFound,
            DispatchError::Unauthorized(_) => ErrorKind::Unauthorized,
            DispatchError::Deserialize(_) | DispatchError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Conflict(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::Unauthorized => DispatchError::Unauthorized("domain rule".to_string()),
        }
    }
}

impl From<AuthzError> for DispatchError {
    fn from(value: AuthzError) -> Self {
        DispatchError::Unauthorized(value.to_string())
    }
}
