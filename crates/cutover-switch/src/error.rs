//! Error types for cutover-switch crate.

use thiserror::Error;

/// Errors that can occur while committing a traffic switch.
#[derive(Debug, Error)]
pub enum SwitchError {
    /// Upstream file could not be read or written.
    #[error("upstream file error: {0}")]
    Io(#[from] std::io::Error),

    /// Proxy reload exited unsuccessfully or could not be spawned.
    #[error("reload `{command}` failed: {reason}")]
    ReloadFailed { command: String, reason: String },

    /// Proxy reload exceeded its deadline.
    #[error("reload `{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// Switch is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Commit refused by the switch.
    #[error("commit rejected: {0}")]
    Rejected(String),
}

/// Result type for switch operations.
pub type SwitchResult<T> = Result<T, SwitchError>;
