//! Error types for cutover-watchdog crate.

use cutover_supervisor::SupervisorError;
use thiserror::Error;

/// Errors that stop the watchdog.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// Watchdog settings are unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Full-stack restart failed; the watchdog gives up.
    #[error("full-stack restart failed during {stage}: {source}")]
    RestartFailed {
        stage: &'static str,
        #[source]
        source: SupervisorError,
    },
}

/// Result type for watchdog operations.
pub type WatchdogResult<T> = Result<T, WatchdogError>;
