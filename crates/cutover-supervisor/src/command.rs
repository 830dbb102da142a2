//! Bounded execution of process manager commands.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{SupervisorError, SupervisorResult};

/// Raw result of a finished command.
pub(crate) struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs one manager binary with a hard deadline per invocation.
#[derive(Debug, Clone)]
pub(crate) struct CommandRunner {
    program: String,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut command = self.program.clone();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }

    /// Run to completion and return the output whatever the exit status.
    pub async fn output(
        &self,
        args: &[&str],
        envs: &[(&str, String)],
    ) -> SupervisorResult<CommandOutput> {
        let command = self.describe(args);
        debug!(command = %command, "Running supervisor command");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| SupervisorError::Timeout {
                command: command.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| SupervisorError::Unreachable(format!("spawn `{}`: {}", command, e)))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run and fail on a non-zero exit status.
    pub async fn run(&self, args: &[&str], envs: &[(&str, String)]) -> SupervisorResult<String> {
        let output = self.output(args, envs).await?;
        if !output.success {
            return Err(SupervisorError::CommandFailed {
                command: self.describe(args),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_unreachable() {
        let runner = CommandRunner::new("definitely-not-a-supervisor", Duration::from_secs(1));
        let err = runner.run(&["jlist"], &[]).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let runner = CommandRunner::new("false", Duration::from_secs(5));
        let err = runner.run(&[], &[]).await.unwrap_err();
        assert!(matches!(err, SupervisorError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_slow_command_times_out() {
        let runner = CommandRunner::new("sleep", Duration::from_millis(50));
        let err = runner.run(&["5"], &[]).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Timeout { .. }));
    }
}
