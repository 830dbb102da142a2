//! Error types for cutover-engine crate.

use cutover_state::StateError;
use cutover_supervisor::SupervisorError;
use cutover_switch::SwitchError;
use cutover_types::{EnvName, FailureReason};
use thiserror::Error;

use crate::phase::TransitionPhase;

/// Why a transition did not complete.
#[derive(Debug, Error)]
pub enum CutoverError {
    /// Target process could not be brought online, or the supervisor did
    /// not answer.
    #[error("environment '{env}' is not running: {source}")]
    ProcessUnavailable {
        env: EnvName,
        #[source]
        source: SupervisorError,
    },

    /// Target is online but never passed its readiness check.
    #[error("environment '{env}' failed health check after {attempts} attempt(s): {reason}")]
    HealthCheckFailed {
        env: EnvName,
        attempts: u32,
        reason: String,
    },

    /// Proxy refused the switch. Routing may not match persisted state.
    #[error("traffic commit to '{env}' failed: {source}")]
    TrafficCommitFailed {
        env: EnvName,
        #[source]
        source: SwitchError,
    },

    /// Traffic moved but the new state could not be persisted.
    #[error("traffic moved to '{env}' but state was not persisted: {reason}")]
    CommitInconsistent { env: EnvName, reason: String },

    /// State store failed before any side effect.
    #[error("state store error: {0}")]
    StateStore(#[from] StateError),

    /// Another transition for the service is in flight.
    #[error("another transition for service '{0}' is in progress")]
    ConcurrentTransitionRejected(String),

    /// Caller withdrew before the switch began.
    #[error("transition cancelled during {phase}")]
    Cancelled { phase: TransitionPhase },

    /// Named environment is not part of the service.
    #[error("unknown environment '{0}'")]
    UnknownEnvironment(EnvName),
}

impl CutoverError {
    /// Machine-parsable reason shown to operators and scripts.
    pub fn reason(&self) -> &'static str {
        match self {
            CutoverError::ProcessUnavailable { .. } => FailureReason::ProcessFailed.as_str(),
            CutoverError::HealthCheckFailed { .. } => FailureReason::HealthFailed.as_str(),
            CutoverError::TrafficCommitFailed { .. } | CutoverError::CommitInconsistent { .. } => {
                FailureReason::CommitInconsistent.as_str()
            }
            CutoverError::Cancelled { .. } => FailureReason::Cancelled.as_str(),
            CutoverError::StateStore(_) => "state_unavailable",
            CutoverError::ConcurrentTransitionRejected(_) => "concurrent_transition",
            CutoverError::UnknownEnvironment(_) => "unknown_environment",
        }
    }

    /// The history reason recorded for this error, if it is recorded at all.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            CutoverError::ProcessUnavailable { .. } => Some(FailureReason::ProcessFailed),
            CutoverError::HealthCheckFailed { .. } => Some(FailureReason::HealthFailed),
            CutoverError::TrafficCommitFailed { .. } | CutoverError::CommitInconsistent { .. } => {
                Some(FailureReason::CommitInconsistent)
            }
            CutoverError::Cancelled { .. } => Some(FailureReason::Cancelled),
            _ => None,
        }
    }

    /// Whether live routing and persisted state are known to agree.
    ///
    /// False only for the consistency alarms, which need an operator.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CutoverError::TrafficCommitFailed { .. } | CutoverError::CommitInconsistent { .. }
        )
    }
}

/// Result type for engine operations.
pub type CutoverResult<T> = Result<T, CutoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasons_are_machine_parsable() {
        let err = CutoverError::HealthCheckFailed {
            env: EnvName::green(),
            attempts: 3,
            reason: "HTTP 503".into(),
        };
        assert_eq!(err.reason(), "health_failed");
        assert_eq!(err.failure_reason(), Some(FailureReason::HealthFailed));
        assert!(err.is_recoverable());

        let err = CutoverError::CommitInconsistent {
            env: EnvName::green(),
            reason: "disk full".into(),
        };
        assert_eq!(err.reason(), "commit_inconsistent");
        assert!(!err.is_recoverable());

        let err = CutoverError::ConcurrentTransitionRejected("api".into());
        assert_eq!(err.reason(), "concurrent_transition");
        assert_eq!(err.failure_reason(), None);
    }
}
