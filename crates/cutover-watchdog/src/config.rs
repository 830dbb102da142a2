//! Watchdog configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for [`FleetWatchdog`](crate::FleetWatchdog).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Platform-wide health endpoint.
    pub url: String,

    /// Time between polls.
    pub interval: Duration,

    /// Deadline for one poll.
    pub timeout: Duration,

    /// Consecutive failed polls that trigger a restart.
    pub failure_threshold: u32,

    /// Pause between stop-all and start-all.
    pub restart_delay: Duration,
}

impl WatchdogConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1/health".to_string(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
            failure_threshold: 2,
            restart_delay: Duration::from_secs(5),
        }
    }
}
