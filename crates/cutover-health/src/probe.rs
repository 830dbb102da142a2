//! Probe trait and outcome types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cutover_types::EnvName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a probe did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnhealthyReason {
    /// Endpoint answered with a non-200 status.
    Status(u16),
    /// No answer within the probe timeout.
    Timeout(u64),
    /// Connection could not be established or was reset.
    Connection(String),
    /// 200 response without the expected status marker.
    BadBody(String),
}

impl fmt::Display for UnhealthyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnhealthyReason::Status(code) => write!(f, "HTTP {}", code),
            UnhealthyReason::Timeout(ms) => write!(f, "timed out after {}ms", ms),
            UnhealthyReason::Connection(e) => write!(f, "connection error: {}", e),
            UnhealthyReason::BadBody(e) => write!(f, "unexpected body: {}", e),
        }
    }
}

/// Classification of a single probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthOutcome {
    Healthy,
    Unhealthy(UnhealthyReason),
}

impl HealthOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthOutcome::Healthy)
    }
}

impl fmt::Display for HealthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthOutcome::Healthy => f.write_str("healthy"),
            HealthOutcome::Unhealthy(reason) => write!(f, "unhealthy ({})", reason),
        }
    }
}

/// Result of probing one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Environment that was probed.
    pub env: EnvName,

    /// URL that was requested.
    pub url: String,

    /// Classification.
    pub outcome: HealthOutcome,

    /// Wall time of the probe in milliseconds.
    pub latency_ms: u64,

    /// When the probe finished.
    pub timestamp: DateTime<Utc>,
}

impl ProbeReport {
    pub fn new(env: EnvName, url: impl Into<String>, outcome: HealthOutcome, latency_ms: u64) -> Self {
        Self {
            env,
            url: url.into(),
            outcome,
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.outcome.is_healthy()
    }
}

/// Readiness check against an environment endpoint.
#[async_trait]
pub trait HealthProber: Send + Sync {
    /// Issue exactly one bounded-timeout check.
    async fn check(&self, env: &EnvName, url: &str) -> ProbeReport;
}
