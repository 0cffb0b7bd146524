//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Shortages are deliberately absent: a shortage is a resolution outcome (an open
/// intervention), never an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before any mutation (bad quantities, over-returns, malformed BOMs).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Routing configuration cannot serve the request (no rule, ambiguous rule, cycle).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A domain invariant was violated (e.g. illegal status transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflicting request (e.g. replayed request id with different inputs).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stock mutation raced and the bounded lock retries were exhausted.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),
}

/// How the surrounding API should surface an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller mistake (4xx).
    Client,
    /// Misconfiguration or internal failure (5xx).
    Server,
    /// Safe to retry (503).
    Transient,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            DomainError::Validation(_)
            | DomainError::InvariantViolation(_)
            | DomainError::InvalidId(_)
            | DomainError::NotFound(_)
            | DomainError::Conflict(_) => ErrorClass::Client,
            DomainError::Configuration(_) => ErrorClass::Server,
            DomainError::Concurrency(_) => ErrorClass::Transient,
        }
    }

    /// HTTP status the API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            DomainError::Validation(_) | DomainError::InvalidId(_) => 400,
            DomainError::NotFound(_) => 404,
            DomainError::Conflict(_) => 409,
            DomainError::InvariantViolation(_) => 422,
            DomainError::Configuration(_) => 500,
            DomainError::Concurrency(_) => 503,
        }
    }

    /// Validation and configuration failures abort the whole triggering operation.
    pub fn aborts_operation(&self) -> bool {
        !matches!(self, DomainError::Concurrency(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_client_error() {
        let err = DomainError::validation("quantity must be positive");
        assert_eq!(err.class(), ErrorClass::Client);
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn configuration_maps_to_server_error() {
        let err = DomainError::configuration("no route for zone ZON09");
        assert_eq!(err.class(), ErrorClass::Server);
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.to_string(), "configuration error: no route for zone ZON09");
    }

    #[test]
    fn concurrency_is_transient() {
        let err = DomainError::concurrency("stock key busy");
        assert_eq!(err.class(), ErrorClass::Transient);
        assert!(!err.aborts_operation());
    }
}
