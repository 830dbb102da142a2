//! CLI error types

use cutover_engine::CutoverError;
use cutover_state::StateError;
use cutover_watchdog::WatchdogError;
use thiserror::Error;

/// Errors surfaced to the operator
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Component wiring failed
    #[error("{0:#}")]
    Setup(#[from] anyhow::Error),

    #[error(transparent)]
    Cutover(#[from] CutoverError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Watchdog(#[from] WatchdogError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Machine-parsable failure reason
    pub fn reason(&self) -> &'static str {
        match self {
            CliError::Cutover(e) => e.reason(),
            CliError::State(_) => "state_unavailable",
            CliError::Watchdog(WatchdogError::RestartFailed { .. }) => "restart_failed",
            CliError::Watchdog(_) => "watchdog_failed",
            CliError::Config(_) | CliError::Setup(_) => "configuration",
            CliError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
