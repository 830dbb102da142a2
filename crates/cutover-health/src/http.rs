//! HTTP readiness prober.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cutover_types::EnvName;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{HealthError, HealthResult};
use crate::probe::{HealthOutcome, HealthProber, ProbeReport, UnhealthyReason};

/// Default per-probe deadline.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default value of the `status` field in a healthy body.
pub const DEFAULT_EXPECTED_STATUS: &str = "healthy";

/// Configuration for [`HttpHealthProber`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProbeConfig {
    /// Deadline covering connect, request and body.
    pub timeout: Duration,

    /// Required value of the body's `status` field.
    pub expected_status: String,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            expected_status: DEFAULT_EXPECTED_STATUS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: Option<String>,
}

/// Readiness prober issuing one GET per check.
pub struct HttpHealthProber {
    client: Client,
    config: HttpProbeConfig,
}

impl HttpHealthProber {
    /// Create a prober; fails if the timeout is zero or the client cannot
    /// be built.
    pub fn new(config: HttpProbeConfig) -> HealthResult<Self> {
        if config.timeout.is_zero() {
            return Err(HealthError::Configuration("probe timeout must be non-zero".into()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpProbeConfig {
        &self.config
    }

    fn classify_error(&self, error: &reqwest::Error) -> UnhealthyReason {
        if error.is_timeout() {
            UnhealthyReason::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            UnhealthyReason::Connection(error.to_string())
        }
    }

    fn classify_body(&self, body: &str) -> HealthOutcome {
        match serde_json::from_str::<StatusBody>(body) {
            Ok(StatusBody { status: Some(status) }) if status == self.config.expected_status => {
                HealthOutcome::Healthy
            }
            Ok(StatusBody { status: Some(status) }) => HealthOutcome::Unhealthy(
                UnhealthyReason::BadBody(format!("status is '{}'", status)),
            ),
            Ok(StatusBody { status: None }) => {
                HealthOutcome::Unhealthy(UnhealthyReason::BadBody("missing status field".into()))
            }
            Err(e) => HealthOutcome::Unhealthy(UnhealthyReason::BadBody(e.to_string())),
        }
    }

    async fn probe(&self, url: &str) -> HealthOutcome {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return HealthOutcome::Unhealthy(self.classify_error(&e)),
        };

        if response.status() != StatusCode::OK {
            return HealthOutcome::Unhealthy(UnhealthyReason::Status(response.status().as_u16()));
        }

        match response.text().await {
            Ok(body) => self.classify_body(&body),
            Err(e) => HealthOutcome::Unhealthy(self.classify_error(&e)),
        }
    }
}

#[async_trait]
impl HealthProber for HttpHealthProber {
    async fn check(&self, env: &EnvName, url: &str) -> ProbeReport {
        let started = Instant::now();
        let outcome = self.probe(url).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            HealthOutcome::Healthy => {
                debug!(env = %env, url, latency_ms, "Health probe passed")
            }
            HealthOutcome::Unhealthy(reason) => {
                warn!(env = %env, url, latency_ms, reason = %reason, "Health probe failed")
            }
        }

        ProbeReport::new(env.clone(), url, outcome, latency_ms)
    }
}
