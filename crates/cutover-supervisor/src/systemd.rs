//! systemd adapter.
//!
//! Each environment runs as a unit named `<service>-<env>.service`. The
//! unit file owns the entry point and port, so `start` only names the unit.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::command::CommandRunner;
use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{ProcessEntry, ProcessSpec, ProcessStatus};
use crate::supervisor::ProcessSupervisor;

fn unit_name(process: &str) -> String {
    if process.ends_with(".service") {
        process.to_string()
    } else {
        format!("{}.service", process)
    }
}

/// Process supervisor backed by `systemctl`.
pub struct SystemdSupervisor {
    runner: CommandRunner,
    units: Vec<String>,
    user: bool,
}

impl SystemdSupervisor {
    /// Manage `processes` (without the `.service` suffix).
    pub fn new(processes: Vec<String>, command_timeout: Duration) -> Self {
        Self {
            runner: CommandRunner::new("systemctl", command_timeout),
            units: processes,
            user: false,
        }
    }

    /// Talk to the per-user manager (`systemctl --user`).
    pub fn user(mut self) -> Self {
        self.user = true;
        self
    }

    /// Units covered by stop-all/start-all. An empty fleet is an error so a
    /// restart never reports success without touching anything.
    fn fleet(&self) -> SupervisorResult<&[String]> {
        if self.units.is_empty() {
            return Err(SupervisorError::Configuration(
                "no systemd units configured for stop-all/start-all".into(),
            ));
        }
        Ok(&self.units)
    }

    async fn systemctl(&self, verb: &str, process: &str) -> SupervisorResult<String> {
        let unit = unit_name(process);
        let mut args: Vec<&str> = Vec::with_capacity(3);
        if self.user {
            args.push("--user");
        }
        args.push(verb);
        args.push(&unit);
        self.runner.run(&args, &[]).await
    }
}

#[async_trait]
impl ProcessSupervisor for SystemdSupervisor {
    fn name(&self) -> &str {
        "systemd"
    }

    async fn list(&self) -> SupervisorResult<Vec<ProcessEntry>> {
        let mut entries = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            entries.push(ProcessEntry::new(unit.clone(), self.status(unit).await));
        }
        Ok(entries)
    }

    async fn status(&self, process: &str) -> ProcessStatus {
        let unit = unit_name(process);
        let mut args: Vec<&str> = Vec::with_capacity(3);
        if self.user {
            args.push("--user");
        }
        args.push("is-active");
        args.push(&unit);

        // is-active exits non-zero for inactive units; only spawn/timeout
        // failures mean the manager is unreachable.
        match self.runner.output(&args, &[]).await {
            Ok(output) if output.stdout.trim() == "active" => ProcessStatus::Online,
            Ok(_) => ProcessStatus::Offline,
            Err(e) => {
                warn!(unit = %unit, error = %e, "systemctl unavailable");
                ProcessStatus::Unknown
            }
        }
    }

    async fn start(&self, spec: &ProcessSpec) -> SupervisorResult<()> {
        self.systemctl("start", &spec.name).await?;
        Ok(())
    }

    async fn stop(&self, process: &str) -> SupervisorResult<()> {
        self.systemctl("stop", process).await?;
        Ok(())
    }

    async fn stop_all(&self) -> SupervisorResult<()> {
        for unit in self.fleet()? {
            self.systemctl("stop", unit).await?;
        }
        Ok(())
    }

    async fn start_all(&self) -> SupervisorResult<()> {
        for unit in self.fleet()? {
            self.systemctl("start", unit).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name() {
        assert_eq!(unit_name("api-green"), "api-green.service");
        assert_eq!(unit_name("api-green.service"), "api-green.service");
    }

    #[tokio::test]
    async fn test_fleet_restart_without_units_fails() {
        let systemd = SystemdSupervisor::new(Vec::new(), Duration::from_secs(1));

        assert!(matches!(
            systemd.stop_all().await,
            Err(SupervisorError::Configuration(_))
        ));
        assert!(matches!(
            systemd.start_all().await,
            Err(SupervisorError::Configuration(_))
        ));
    }
}
