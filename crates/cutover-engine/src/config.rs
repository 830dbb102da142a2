//! Engine configuration.

use std::time::Duration;

use cutover_supervisor::StartPolicy;
use cutover_types::{DEFAULT_HEALTH_PATH, DEFAULT_HISTORY_LIMIT};

/// Tuning for one [`CutoverEngine`](crate::CutoverEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum history records kept in the persisted state.
    pub history_limit: usize,

    /// Attempt budget for bringing the target process online.
    pub start_policy: StartPolicy,

    /// Readiness probes before giving up on the target.
    pub health_attempts: u32,

    /// Pause between readiness probes.
    pub health_interval: Duration,

    /// Path used to derive readiness URLs when an environment has none.
    pub health_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            start_policy: StartPolicy::default(),
            health_attempts: 3,
            health_interval: Duration::from_secs(2),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_start_policy(mut self, policy: StartPolicy) -> Self {
        self.start_policy = policy;
        self
    }

    /// Probe `attempts` times with `interval` in between. At least one probe
    /// is always issued.
    pub fn with_health_retries(mut self, attempts: u32, interval: Duration) -> Self {
        self.health_attempts = attempts.max(1);
        self.health_interval = interval;
        self
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }
}
