//! Error types for cutover-health crate.

use thiserror::Error;

/// Errors raised while setting up probes.
///
/// Probe outcomes themselves are never errors; see
/// [`HealthOutcome`](crate::HealthOutcome).
#[derive(Debug, Error)]
pub enum HealthError {
    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Probe configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for health operations.
pub type HealthResult<T> = Result<T, HealthError>;
