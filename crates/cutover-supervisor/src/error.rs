//! Error types for cutover-supervisor crate.

use thiserror::Error;

/// Errors raised while talking to a process manager.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The manager could not be reached or spawned.
    #[error("process manager unreachable: {0}")]
    Unreachable(String),

    /// A manager command exited unsuccessfully.
    #[error("command `{command}` failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A manager command exceeded its deadline.
    #[error("command `{command}` timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// Manager output could not be parsed.
    #[error("unparseable process list: {0}")]
    Parse(String),

    /// The adapter was asked to do something its settings cannot express.
    #[error("supervisor misconfigured: {0}")]
    Configuration(String),

    /// The process never reached online within the attempt budget.
    #[error("process {process} failed to start after {attempts} attempts: {reason}")]
    StartFailed {
        process: String,
        attempts: u32,
        reason: String,
    },
}

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;
