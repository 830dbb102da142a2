//! Polling loop and restart escalation.

use std::future::Future;
use std::sync::Arc;

use cutover_supervisor::ProcessSupervisor;
use reqwest::{Client, StatusCode};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::WatchdogConfig;
use crate::error::{WatchdogError, WatchdogResult};

/// What one poll led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Healthy,
    /// Failed poll below the restart threshold.
    Unhealthy { consecutive: u32, reason: String },
    /// Threshold reached and the stack was restarted.
    Restarted,
}

/// Platform watchdog.
pub struct FleetWatchdog {
    client: Client,
    supervisor: Arc<dyn ProcessSupervisor>,
    config: WatchdogConfig,
    consecutive_failures: u32,
}

impl FleetWatchdog {
    pub fn new(config: WatchdogConfig, supervisor: Arc<dyn ProcessSupervisor>) -> WatchdogResult<Self> {
        if config.failure_threshold == 0 {
            return Err(WatchdogError::Configuration(
                "failure_threshold must be at least 1".into(),
            ));
        }
        if config.interval.is_zero() || config.timeout.is_zero() {
            return Err(WatchdogError::Configuration(
                "interval and timeout must be non-zero".into(),
            ));
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            supervisor,
            config,
            consecutive_failures: 0,
        })
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Poll until a restart fails.
    pub async fn run(&mut self) -> WatchdogResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Poll until `shutdown` completes or a restart fails.
    pub async fn run_until<S>(&mut self, shutdown: S) -> WatchdogResult<()>
    where
        S: Future<Output = ()>,
    {
        info!(
            url = %self.config.url,
            interval_ms = self.config.interval.as_millis() as u64,
            failure_threshold = self.config.failure_threshold,
            "Watchdog started"
        );

        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Watchdog stopped");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.tick().await?;
                }
            }
        }
    }

    /// One poll, escalating to a restart at the threshold.
    pub async fn tick(&mut self) -> WatchdogResult<TickOutcome> {
        let reason = match self.poll().await {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!(
                        previous_failures = self.consecutive_failures,
                        "Platform recovered"
                    );
                }
                self.consecutive_failures = 0;
                return Ok(TickOutcome::Healthy);
            }
            Err(reason) => reason,
        };

        self.consecutive_failures += 1;
        warn!(
            url = %self.config.url,
            consecutive = self.consecutive_failures,
            reason = %reason,
            "Platform health check failed"
        );

        if self.consecutive_failures < self.config.failure_threshold {
            return Ok(TickOutcome::Unhealthy {
                consecutive: self.consecutive_failures,
                reason,
            });
        }

        self.restart().await?;
        self.consecutive_failures = 0;
        Ok(TickOutcome::Restarted)
    }

    async fn poll(&self) -> Result<(), String> {
        match self.client.get(&self.config.url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!(url = %self.config.url, "Platform healthy");
                Ok(())
            }
            Ok(response) => Err(format!("HTTP {}", response.status().as_u16())),
            Err(e) if e.is_timeout() => Err(format!(
                "timed out after {}ms",
                self.config.timeout.as_millis()
            )),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn restart(&self) -> WatchdogResult<()> {
        warn!(
            supervisor = self.supervisor.name(),
            threshold = self.config.failure_threshold,
            "Restarting full stack"
        );

        self.supervisor.stop_all().await.map_err(|source| {
            error!(error = %source, "Stop-all failed, watchdog giving up");
            WatchdogError::RestartFailed {
                stage: "stop_all",
                source,
            }
        })?;

        tokio::time::sleep(self.config.restart_delay).await;

        self.supervisor.start_all().await.map_err(|source| {
            error!(error = %source, "Start-all failed, watchdog giving up");
            WatchdogError::RestartFailed {
                stage: "start_all",
                source,
            }
        })?;

        info!("Full stack restarted");
        Ok(())
    }
}
