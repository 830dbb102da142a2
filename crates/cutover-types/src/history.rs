//! Transition history records

use crate::environment::EnvName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of transition that produced a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Rollback,
    Promote,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Rollback => "rollback",
            TransitionAction::Promote => "promote",
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStatus {
    Success,
    Failed,
}

impl fmt::Display for TransitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionStatus::Success => f.write_str("success"),
            TransitionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Machine-parsable failure reason shown to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Target process could not be brought online.
    ProcessFailed,
    /// Target process is online but failed its readiness check.
    HealthFailed,
    /// Live traffic and persisted state may have diverged.
    CommitInconsistent,
    /// Caller withdrew before the switch began.
    Cancelled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ProcessFailed => "process_failed",
            FailureReason::HealthFailed => "health_failed",
            FailureReason::CommitInconsistent => "commit_inconsistent",
            FailureReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the bounded, append-only transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub timestamp: DateTime<Utc>,
    pub action: TransitionAction,
    pub from_env: EnvName,
    pub to_env: EnvName,
    pub status: TransitionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(default)]
    pub details: String,
}

impl TransitionRecord {
    /// Record a committed transition.
    pub fn success(
        action: TransitionAction,
        from_env: EnvName,
        to_env: EnvName,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            from_env,
            to_env,
            status: TransitionStatus::Success,
            reason: None,
            details: details.into(),
        }
    }

    /// Record an aborted or inconsistent transition.
    pub fn failed(
        action: TransitionAction,
        from_env: EnvName,
        to_env: EnvName,
        reason: FailureReason,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            from_env,
            to_env,
            status: TransitionStatus::Failed,
            reason: Some(reason),
            details: details.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TransitionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_serializes_reason() {
        let record = TransitionRecord::failed(
            TransitionAction::Rollback,
            EnvName::blue(),
            EnvName::green(),
            FailureReason::HealthFailed,
            "HTTP 503",
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "health_failed");
        assert_eq!(json["action"], "rollback");
    }

    #[test]
    fn test_success_record_omits_reason() {
        let record = TransitionRecord::success(
            TransitionAction::Promote,
            EnvName::blue(),
            EnvName::green(),
            "v2",
        );
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("reason").is_none());
        assert!(record.is_success());
    }
}
