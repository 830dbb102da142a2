//! Process descriptions shared by all adapters.

use cutover_types::{EnvName, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process name for an environment: `<service>-<env>`.
pub fn process_name(service: &str, env: &EnvName) -> String {
    format!("{}-{}", service, env)
}

/// Coarse process state as seen by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Online,
    Offline,
    Unknown,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Online => f.write_str("online"),
            ProcessStatus::Offline => f.write_str("offline"),
            ProcessStatus::Unknown => f.write_str("unknown"),
        }
    }
}

/// One row of the manager's process list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub name: String,
    pub status: ProcessStatus,
}

impl ProcessEntry {
    pub fn new(name: impl Into<String>, status: ProcessStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// What the manager needs to start an environment's process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    pub path: String,
    pub port: u16,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, path: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            port,
        }
    }

    /// Spec for `env` of `service`, named by [`process_name`].
    pub fn for_environment(service: &str, name: &EnvName, env: &Environment) -> Self {
        Self::new(process_name(service, name), env.path.clone(), env.port)
    }
}
