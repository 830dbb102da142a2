//! Configuration for the cutover CLI
//!
//! Layers, lowest first: built-in defaults, the optional TOML file given by
//! `--config` / `CUTOVER_CONFIG`, then `CUTOVER_<SECTION>__<KEY>`
//! environment variables (for example `CUTOVER_STATE__DIR`).

use std::path::PathBuf;
use std::time::Duration;

use cutover_health::HttpProbeConfig;
use cutover_supervisor::StartPolicy;
use cutover_types::{DEFAULT_HEALTH_PATH, DEFAULT_HISTORY_LIMIT};
use cutover_watchdog::WatchdogConfig;
use serde::{Deserialize, Serialize};

/// Full CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutoverConfig {
    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub switch: SwitchConfig,

    #[serde(default)]
    pub watchdog: WatchdogSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where deployment records live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding one `<service>.json` per service
    pub dir: PathBuf,

    /// History records kept per service
    pub history_limit: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/var/lib/cutover"),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Process manager backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorKind {
    Pm2,
    Systemd,
}

/// Process supervisor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub kind: SupervisorKind,

    /// Override for the manager binary (pm2 only)
    pub binary: Option<String>,

    /// Ecosystem file used by start-all (pm2 only)
    pub ecosystem: Option<String>,

    /// Units managed by stop-all/start-all (systemd only)
    pub units: Vec<String>,

    /// Talk to the user manager instead of the system one (systemd only)
    pub user: bool,

    pub command_timeout_secs: u64,
    pub start_attempts: u32,
    pub start_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            kind: SupervisorKind::Pm2,
            binary: None,
            ecosystem: None,
            units: Vec::new(),
            user: false,
            command_timeout_secs: 10,
            start_attempts: 5,
            start_backoff_ms: 500,
            max_backoff_ms: 5_000,
        }
    }
}

impl SupervisorConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn start_policy(&self) -> StartPolicy {
        StartPolicy {
            attempts: self.start_attempts,
            initial_backoff: Duration::from_millis(self.start_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Readiness probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub timeout_secs: u64,
    pub expected_status: String,
    pub attempts: u32,
    pub interval_ms: u64,

    /// Path appended to `http://127.0.0.1:<port>` when an environment has no
    /// explicit health URL
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            expected_status: "healthy".to_string(),
            attempts: 3,
            interval_ms: 2_000,
            path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

impl HealthConfig {
    pub fn probe_config(&self) -> HttpProbeConfig {
        HttpProbeConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            expected_status: self.expected_status.clone(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Fronting proxy backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchKind {
    Nginx,
    /// No proxy managed; commits are only logged
    None,
}

/// Traffic switch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub kind: SwitchKind,

    /// Directory included by nginx (`include <dir>/*.conf;`); each service
    /// gets `<service>.conf`
    pub upstream_dir: Option<PathBuf>,

    pub reload_command: String,
    pub timeout_secs: u64,
}

impl SwitchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchKind::Nginx => "nginx",
            SwitchKind::None => "none",
        }
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            kind: SwitchKind::None,
            upstream_dir: None,
            reload_command: cutover_switch::DEFAULT_RELOAD_COMMAND.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Fleet watchdog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSection {
    pub url: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub failure_threshold: u32,
    pub restart_delay_secs: u64,
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/health".to_string(),
            interval_secs: 30,
            timeout_secs: 5,
            failure_threshold: 2,
            restart_delay_secs: 5,
        }
    }
}

impl WatchdogSection {
    pub fn to_config(&self) -> WatchdogConfig {
        WatchdogConfig {
            url: self.url.clone(),
            interval: Duration::from_secs(self.interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            failure_threshold: self.failure_threshold,
            restart_delay: Duration::from_secs(self.restart_delay_secs),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CutoverConfig {
    /// Load defaults, then the file at `path`, then the environment.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CutoverConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CUTOVER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
