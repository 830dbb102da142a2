//! pm2 adapter.
//!
//! Talks to pm2 through its CLI: `pm2 jlist` for the process list (a JSON
//! array of `{ "name": ..., "pm2_env": { "status": ... } }`), `start`,
//! `delete` and `stop` for control.
//!
//! pm2 remembers the script path a process was first started with, so a
//! known process is deleted and started again rather than restarted. That
//! way a promoted install path and the current `PORT` always take effect.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::command::CommandRunner;
use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{ProcessEntry, ProcessSpec, ProcessStatus};
use crate::supervisor::ProcessSupervisor;

#[derive(Debug, Deserialize)]
struct Pm2Process {
    name: String,
    #[serde(default)]
    pm2_env: Option<Pm2Env>,
}

#[derive(Debug, Deserialize)]
struct Pm2Env {
    #[serde(default)]
    status: Option<String>,
}

fn map_status(status: Option<&str>) -> ProcessStatus {
    match status {
        Some("online") => ProcessStatus::Online,
        // stopped, stopping, errored, launching, one-launch-status
        Some(_) => ProcessStatus::Offline,
        None => ProcessStatus::Unknown,
    }
}

/// Parse `pm2 jlist` output.
///
/// pm2 may print banner or warning lines before the JSON array, so parsing
/// starts at the first `[`.
pub fn parse_jlist(output: &str) -> SupervisorResult<Vec<ProcessEntry>> {
    let start = output
        .find('[')
        .ok_or_else(|| SupervisorError::Parse("no JSON array in pm2 output".into()))?;
    let processes: Vec<Pm2Process> = serde_json::from_str(output[start..].trim_end())
        .map_err(|e| SupervisorError::Parse(e.to_string()))?;

    Ok(processes
        .into_iter()
        .map(|p| {
            let status = map_status(p.pm2_env.as_ref().and_then(|env| env.status.as_deref()));
            ProcessEntry::new(p.name, status)
        })
        .collect())
}

/// Process supervisor backed by the pm2 CLI.
pub struct Pm2Supervisor {
    runner: CommandRunner,
    ecosystem: Option<String>,
}

impl Pm2Supervisor {
    /// Use the `pm2` binary on `PATH` with a per-command timeout.
    pub fn new(command_timeout: Duration) -> Self {
        Self::with_binary("pm2", command_timeout)
    }

    /// Use a specific pm2 binary.
    pub fn with_binary(binary: impl Into<String>, command_timeout: Duration) -> Self {
        Self {
            runner: CommandRunner::new(binary, command_timeout),
            ecosystem: None,
        }
    }

    /// Start the whole stack from an ecosystem file instead of `start all`.
    pub fn with_ecosystem(mut self, path: impl Into<String>) -> Self {
        self.ecosystem = Some(path.into());
        self
    }
}

#[async_trait]
impl ProcessSupervisor for Pm2Supervisor {
    fn name(&self) -> &str {
        "pm2"
    }

    async fn list(&self) -> SupervisorResult<Vec<ProcessEntry>> {
        let stdout = self.runner.run(&["jlist"], &[]).await?;
        parse_jlist(&stdout)
    }

    async fn start(&self, spec: &ProcessSpec) -> SupervisorResult<()> {
        let known = self.list().await?.iter().any(|entry| entry.name == spec.name);
        let port = vec![("PORT", spec.port.to_string())];

        if known {
            self.runner.run(&["delete", &spec.name], &[]).await?;
        }
        self.runner
            .run(&["start", &spec.path, "--name", &spec.name, "--update-env"], &port)
            .await?;
        info!(process = %spec.name, path = %spec.path, replaced = known, "pm2 start issued");
        Ok(())
    }

    async fn stop(&self, process: &str) -> SupervisorResult<()> {
        self.runner.run(&["stop", process], &[]).await?;
        Ok(())
    }

    async fn stop_all(&self) -> SupervisorResult<()> {
        self.runner.run(&["stop", "all"], &[]).await?;
        Ok(())
    }

    async fn start_all(&self) -> SupervisorResult<()> {
        match &self.ecosystem {
            Some(ecosystem) => self.runner.run(&["start", ecosystem], &[]).await?,
            None => self.runner.run(&["start", "all"], &[]).await?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jlist() {
        let output = r#"[
            {"name": "api-blue", "pm_id": 0, "pm2_env": {"status": "online"}},
            {"name": "api-green", "pm_id": 1, "pm2_env": {"status": "stopped"}},
            {"name": "worker"}
        ]"#;

        let entries = parse_jlist(output).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], ProcessEntry::new("api-blue", ProcessStatus::Online));
        assert_eq!(entries[1], ProcessEntry::new("api-green", ProcessStatus::Offline));
        assert_eq!(entries[2].status, ProcessStatus::Unknown);
    }

    #[test]
    fn test_parse_jlist_skips_banner() {
        let output = ">>>> In-memory PM2 is out-of-date\n[{\"name\":\"api-green\",\"pm2_env\":{\"status\":\"errored\"}}]\n";
        let entries = parse_jlist(output).unwrap();
        assert_eq!(entries, vec![ProcessEntry::new("api-green", ProcessStatus::Offline)]);
    }

    #[test]
    fn test_parse_jlist_rejects_garbage() {
        assert!(matches!(parse_jlist("pm2: command not found"), Err(SupervisorError::Parse(_))));
        assert!(matches!(parse_jlist("[{\"nam"), Err(SupervisorError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_unknown() {
        let supervisor =
            Pm2Supervisor::with_binary("definitely-not-pm2", Duration::from_secs(1));
        assert_eq!(supervisor.status("api-green").await, ProcessStatus::Unknown);
    }
}
