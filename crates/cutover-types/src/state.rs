//! Deployment state aggregate
//!
//! One [`DeploymentState`] exists per logical service. It owns the two
//! environments, the active pointer and the bounded history. The fields are
//! private so the invariants below can only be broken by hand-edited files,
//! which [`DeploymentState::validate`] rejects on load:
//!
//! - exactly two environments, each on a distinct port
//! - `active_env` names one of them

use crate::environment::{EnvName, Environment};
use crate::error::ValidationError;
use crate::history::TransitionRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};

/// History entries kept when no limit is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Version tag assigned to both slots at provisioning time.
pub const BOOTSTRAP_VERSION: &str = "0.0.0";

/// Root aggregate persisted by the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    service: String,
    active_env: EnvName,
    environments: BTreeMap<EnvName, Environment>,
    #[serde(default)]
    history: VecDeque<TransitionRecord>,
}

impl DeploymentState {
    /// Build a validated state from exactly two environments.
    pub fn provision(
        service: impl Into<String>,
        environments: [(EnvName, Environment); 2],
        active: EnvName,
    ) -> Result<Self, ValidationError> {
        let state = Self {
            service: service.into(),
            active_env: active,
            environments: environments.into_iter().collect(),
            history: VecDeque::new(),
        };
        state.validate()?;
        Ok(state)
    }

    /// Default layout: blue on 3001 (active), green on 3002.
    pub fn bootstrap(service: impl Into<String>) -> Self {
        let service = service.into();
        let blue = Environment::new(3001, BOOTSTRAP_VERSION, format!("/srv/{}/blue", service));
        let green = Environment::new(3002, BOOTSTRAP_VERSION, format!("/srv/{}/green", service));
        Self {
            service,
            active_env: EnvName::blue(),
            environments: [(EnvName::blue(), blue), (EnvName::green(), green)]
                .into_iter()
                .collect(),
            history: VecDeque::new(),
        }
    }

    /// Check every aggregate invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service.trim().is_empty() {
            return Err(ValidationError::EmptyService);
        }
        if self.environments.len() != 2 {
            return Err(ValidationError::EnvironmentCount(self.environments.len()));
        }
        if !self.environments.contains_key(&self.active_env) {
            return Err(ValidationError::ActiveNotDefined(self.active_env.clone()));
        }
        let mut ports = HashSet::new();
        for env in self.environments.values() {
            if !ports.insert(env.port) {
                return Err(ValidationError::DuplicatePort(env.port));
            }
        }
        Ok(())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn active_env(&self) -> &EnvName {
        &self.active_env
    }

    pub fn environments(&self) -> &BTreeMap<EnvName, Environment> {
        &self.environments
    }

    pub fn environment(&self, name: &EnvName) -> Option<&Environment> {
        self.environments.get(name)
    }

    pub fn environment_mut(&mut self, name: &EnvName) -> Option<&mut Environment> {
        self.environments.get_mut(name)
    }

    /// The environment currently receiving traffic.
    pub fn active(&self) -> Option<&Environment> {
        self.environments.get(&self.active_env)
    }

    /// The single environment that is not active.
    pub fn inactive_env(&self) -> Option<&EnvName> {
        self.environments.keys().find(|name| **name != self.active_env)
    }

    /// Move the active pointer.
    pub fn set_active(&mut self, name: EnvName) -> Result<(), ValidationError> {
        if !self.environments.contains_key(&name) {
            return Err(ValidationError::UnknownEnvironment(name));
        }
        self.active_env = name;
        Ok(())
    }

    pub fn history(&self) -> &VecDeque<TransitionRecord> {
        &self.history
    }

    /// Append a record, evicting the oldest entries beyond `limit`.
    ///
    /// A limit of zero is treated as one: the latest outcome is always kept.
    pub fn record(&mut self, record: TransitionRecord, limit: usize) {
        self.history.push_back(record);
        let limit = limit.max(1);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }

    /// The last `n` records in insertion order.
    pub fn recent_history(&self, n: usize) -> impl Iterator<Item = &TransitionRecord> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip)
    }

    pub fn last_transition(&self) -> Option<&TransitionRecord> {
        self.history.back()
    }
}
