//! Operation results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cutover_health::ProbeReport;
use cutover_types::{DeploymentState, EnvName, Environment, TransitionAction, TransitionRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a successful transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionReport {
    /// Attempt identifier; absent for no-op requests.
    pub attempt_id: Option<Uuid>,
    pub service: String,
    pub action: TransitionAction,
    pub from_env: EnvName,
    pub to_env: EnvName,

    /// Version now serving traffic.
    pub version: String,

    /// False when the target was already active and nothing happened.
    pub changed: bool,

    /// Probe that cleared the target for traffic.
    pub health: Option<ProbeReport>,
    pub completed_at: DateTime<Utc>,
}

/// Read-only view of a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub service: String,
    pub active_env: EnvName,
    pub environments: BTreeMap<EnvName, Environment>,

    /// Most recent history records, oldest first.
    pub history: Vec<TransitionRecord>,
}

impl StatusReport {
    /// Summarize `state` with its last `limit` history records.
    pub fn from_state(state: &DeploymentState, limit: usize) -> Self {
        Self {
            service: state.service().to_string(),
            active_env: state.active_env().clone(),
            environments: state.environments().clone(),
            history: state.recent_history(limit).cloned().collect(),
        }
    }

    pub fn active(&self) -> Option<&Environment> {
        self.environments.get(&self.active_env)
    }
}
