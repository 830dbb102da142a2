//! Error types for cutover-state crate.

use cutover_types::ValidationError;
use thiserror::Error;

/// Errors raised by state store backends.
#[derive(Debug, Error)]
pub enum StateError {
    /// No record has been provisioned for the service.
    #[error("no deployment state for service '{0}'")]
    NotFound(String),

    /// Underlying storage failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record decoded but violates the aggregate invariants.
    #[error("corrupt deployment state for service '{service}': {source}")]
    Corrupt {
        service: String,
        #[source]
        source: ValidationError,
    },

    /// Another process holds the transition lock.
    #[error("deployment state for service '{0}' is locked by another process")]
    Locked(String),

    /// Failure injected by a test backend.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;
