//! Transition state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use cutover_types::{EnvName, FailureReason, TransitionAction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionPhase {
    Idle,
    VerifyingProcess,
    CheckingHealth,
    Switching,
    Committed,
    Aborted(FailureReason),
}

impl TransitionPhase {
    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: TransitionPhase) -> bool {
        use TransitionPhase::*;
        matches!(
            (self, next),
            (Idle, VerifyingProcess)
                | (Idle, Aborted(FailureReason::Cancelled))
                | (VerifyingProcess, CheckingHealth)
                | (VerifyingProcess, Aborted(FailureReason::ProcessFailed))
                | (VerifyingProcess, Aborted(FailureReason::Cancelled))
                | (CheckingHealth, Switching)
                | (CheckingHealth, Aborted(FailureReason::HealthFailed))
                | (CheckingHealth, Aborted(FailureReason::Cancelled))
                | (Switching, Committed)
                | (Switching, Aborted(FailureReason::CommitInconsistent))
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransitionPhase::Committed | TransitionPhase::Aborted(_))
    }

    /// Phases a caller may still withdraw from.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            TransitionPhase::Idle | TransitionPhase::VerifyingProcess | TransitionPhase::CheckingHealth
        )
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPhase::Idle => f.write_str("IDLE"),
            TransitionPhase::VerifyingProcess => f.write_str("VERIFYING_PROCESS"),
            TransitionPhase::CheckingHealth => f.write_str("CHECKING_HEALTH"),
            TransitionPhase::Switching => f.write_str("SWITCHING"),
            TransitionPhase::Committed => f.write_str("COMMITTED"),
            TransitionPhase::Aborted(reason) => write!(f, "ABORTED({})", reason),
        }
    }
}

/// One in-flight run of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionAttempt {
    pub id: Uuid,
    pub service: String,
    pub action: TransitionAction,
    pub from_env: EnvName,
    pub to_env: EnvName,
    pub phase: TransitionPhase,
    pub started_at: DateTime<Utc>,
}

impl TransitionAttempt {
    pub fn new(
        service: impl Into<String>,
        action: TransitionAction,
        from_env: EnvName,
        to_env: EnvName,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service: service.into(),
            action,
            from_env,
            to_env,
            phase: TransitionPhase::Idle,
            started_at: Utc::now(),
        }
    }

    /// Move to `next`. Illegal moves are a programming error.
    pub fn advance(&mut self, next: TransitionPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            TransitionPhase::Idle,
            TransitionPhase::VerifyingProcess,
            TransitionPhase::CheckingHealth,
            TransitionPhase::Switching,
            TransitionPhase::Committed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_abort_exits() {
        assert!(TransitionPhase::VerifyingProcess
            .can_transition_to(TransitionPhase::Aborted(FailureReason::ProcessFailed)));
        assert!(TransitionPhase::CheckingHealth
            .can_transition_to(TransitionPhase::Aborted(FailureReason::HealthFailed)));
        assert!(!TransitionPhase::VerifyingProcess
            .can_transition_to(TransitionPhase::Aborted(FailureReason::HealthFailed)));
        assert!(!TransitionPhase::Switching
            .can_transition_to(TransitionPhase::Aborted(FailureReason::Cancelled)));
    }

    #[test]
    fn test_no_skipping_checks() {
        assert!(!TransitionPhase::Idle.can_transition_to(TransitionPhase::Switching));
        assert!(!TransitionPhase::VerifyingProcess.can_transition_to(TransitionPhase::Switching));
        assert!(!TransitionPhase::Committed.can_transition_to(TransitionPhase::Idle));
    }

    #[test]
    fn test_cancellable_phases() {
        assert!(TransitionPhase::CheckingHealth.is_cancellable());
        assert!(!TransitionPhase::Switching.is_cancellable());
        assert!(TransitionPhase::Aborted(FailureReason::Cancelled).is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransitionPhase::Aborted(FailureReason::HealthFailed).to_string(),
            "ABORTED(health_failed)"
        );
        assert_eq!(TransitionPhase::VerifyingProcess.to_string(), "VERIFYING_PROCESS");
    }
}
