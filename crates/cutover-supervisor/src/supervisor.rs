//! Supervisor trait and the bounded start loop.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{ProcessEntry, ProcessSpec, ProcessStatus};

/// Attempt budget for bringing a process online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartPolicy {
    /// Status polls after the start command.
    pub attempts: u32,
    /// Delay before the first poll; doubled after each miss.
    pub initial_backoff: Duration,
    /// Upper bound for the doubled delay.
    pub max_backoff: Duration,
}

impl Default for StartPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl StartPolicy {
    /// Poll `attempts` times without sleeping in between.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before poll number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Query and control of named OS-level processes.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Manager name for logging.
    fn name(&self) -> &str;

    /// Every process the manager knows about.
    async fn list(&self) -> SupervisorResult<Vec<ProcessEntry>>;

    /// Start (or restart) the process described by `spec`.
    ///
    /// Fire-and-forget: the process reaches online eventually, if at all.
    async fn start(&self, spec: &ProcessSpec) -> SupervisorResult<()>;

    /// Stop one process.
    async fn stop(&self, process: &str) -> SupervisorResult<()>;

    /// Stop every managed process.
    async fn stop_all(&self) -> SupervisorResult<()>;

    /// Start every managed process.
    async fn start_all(&self) -> SupervisorResult<()>;

    /// Status of one process, [`ProcessStatus::Unknown`] if the manager
    /// cannot be queried.
    async fn status(&self, process: &str) -> ProcessStatus {
        match self.list().await {
            Ok(entries) => entries
                .iter()
                .find(|entry| entry.name == process)
                .map(|entry| entry.status)
                .unwrap_or(ProcessStatus::Offline),
            Err(e) => {
                warn!(supervisor = self.name(), process, error = %e, "Process status unavailable");
                ProcessStatus::Unknown
            }
        }
    }

    /// Make sure the process is online, starting it if needed.
    ///
    /// A no-op for a process that is already online. An unreachable manager
    /// fails immediately without issuing a start.
    async fn ensure_running(&self, spec: &ProcessSpec, policy: &StartPolicy) -> SupervisorResult<()> {
        match self.status(&spec.name).await {
            ProcessStatus::Online => {
                debug!(supervisor = self.name(), process = %spec.name, "Process already online");
                return Ok(());
            }
            ProcessStatus::Unknown => {
                return Err(SupervisorError::Unreachable(format!(
                    "{} did not report status for {}",
                    self.name(),
                    spec.name
                )));
            }
            ProcessStatus::Offline => {}
        }

        info!(
            supervisor = self.name(),
            process = %spec.name,
            path = %spec.path,
            port = spec.port,
            "Starting process"
        );
        start_and_wait(self, spec, policy).await
    }

    /// Start the process from `spec` even if an older instance is online,
    /// then wait for it to come up. Used when the install changed.
    ///
    /// An unreachable manager fails immediately without issuing a start.
    async fn redeploy(&self, spec: &ProcessSpec, policy: &StartPolicy) -> SupervisorResult<()> {
        if self.status(&spec.name).await == ProcessStatus::Unknown {
            return Err(SupervisorError::Unreachable(format!(
                "{} did not report status for {}",
                self.name(),
                spec.name
            )));
        }

        info!(
            supervisor = self.name(),
            process = %spec.name,
            path = %spec.path,
            port = spec.port,
            "Redeploying process"
        );
        start_and_wait(self, spec, policy).await
    }
}

async fn start_and_wait<S>(supervisor: &S, spec: &ProcessSpec, policy: &StartPolicy) -> SupervisorResult<()>
where
    S: ProcessSupervisor + ?Sized,
{
    supervisor
        .start(spec)
        .await
        .map_err(|e| SupervisorError::StartFailed {
            process: spec.name.clone(),
            attempts: 0,
            reason: e.to_string(),
        })?;

    let mut last = ProcessStatus::Offline;
    for attempt in 0..policy.attempts {
        tokio::time::sleep(policy.backoff(attempt)).await;
        last = supervisor.status(&spec.name).await;
        if last == ProcessStatus::Online {
            info!(process = %spec.name, attempt = attempt + 1, "Process online");
            return Ok(());
        }
        debug!(
            process = %spec.name,
            attempt = attempt + 1,
            status = %last,
            "Process not online yet"
        );
    }

    Err(SupervisorError::StartFailed {
        process: spec.name.clone(),
        attempts: policy.attempts,
        reason: format!("last status {}", last),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_supervisor::StaticSupervisor;

    fn spec() -> ProcessSpec {
        ProcessSpec::new("api-green", "/srv/api/green", 3002)
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = StartPolicy {
            attempts: 6,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_online_process_is_noop() {
        let supervisor = StaticSupervisor::new();
        supervisor.set_status("api-green", ProcessStatus::Online);

        supervisor
            .ensure_running(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap();
        assert!(supervisor.started().is_empty());
    }

    #[tokio::test]
    async fn test_offline_process_is_started() {
        let supervisor = StaticSupervisor::new();
        supervisor.set_status("api-green", ProcessStatus::Offline);

        supervisor
            .ensure_running(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap();
        assert_eq!(supervisor.started(), vec!["api-green".to_string()]);
    }

    #[tokio::test]
    async fn test_process_that_never_comes_up() {
        let supervisor = StaticSupervisor::new();
        supervisor.set_start_brings_online(false);

        let err = supervisor
            .ensure_running(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::StartFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_manager_never_starts() {
        let supervisor = StaticSupervisor::new();
        supervisor.fail_list(true);

        let err = supervisor
            .ensure_running(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Unreachable(_)));
        assert!(supervisor.started().is_empty());
    }

    #[tokio::test]
    async fn test_start_command_failure() {
        let supervisor = StaticSupervisor::new();
        supervisor.fail_start(true);

        let err = supervisor
            .ensure_running(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::StartFailed { attempts: 0, .. }));
    }

    #[tokio::test]
    async fn test_redeploy_restarts_online_process() {
        let supervisor = StaticSupervisor::new();
        supervisor.set_status("api-green", ProcessStatus::Online);

        supervisor
            .redeploy(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap();
        assert_eq!(supervisor.started(), vec!["api-green".to_string()]);
    }

    #[tokio::test]
    async fn test_redeploy_with_unreachable_manager() {
        let supervisor = StaticSupervisor::new();
        supervisor.fail_list(true);

        let err = supervisor
            .redeploy(&spec(), &StartPolicy::immediate(3))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Unreachable(_)));
        assert!(supervisor.started().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_start_within_budget() {
        let supervisor = StaticSupervisor::new();
        supervisor.set_start_brings_online(false);
        supervisor.script(
            "api-green",
            vec![
                ProcessStatus::Offline,
                ProcessStatus::Offline,
                ProcessStatus::Offline,
                ProcessStatus::Online,
            ],
        );

        let policy = StartPolicy {
            attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        supervisor.ensure_running(&spec(), &policy).await.unwrap();
    }
}
