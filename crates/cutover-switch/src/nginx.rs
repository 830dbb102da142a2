//! nginx upstream switch.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use cutover_types::{EnvName, Environment};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::{SwitchError, SwitchResult};
use crate::switch::TrafficSwitch;

/// Reload command used when none is configured.
pub const DEFAULT_RELOAD_COMMAND: &str = "nginx -s reload";

/// Render the upstream block routing `service` to `port` on loopback.
pub fn render_upstream(service: &str, env: &EnvName, port: u16) -> String {
    format!(
        "# managed by cutover: {service} -> {env}\nupstream {service} {{\n    server 127.0.0.1:{port};\n}}\n"
    )
}

/// Configuration for [`NginxUpstreamSwitch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NginxSwitchConfig {
    /// Directory included by nginx; each service owns `<service>.conf`.
    pub upstream_dir: PathBuf,

    /// Whitespace-separated reload command.
    pub reload_command: String,

    /// Deadline for the reload command.
    pub timeout: Duration,
}

impl NginxSwitchConfig {
    pub fn new(upstream_dir: impl Into<PathBuf>) -> Self {
        Self {
            upstream_dir: upstream_dir.into(),
            reload_command: DEFAULT_RELOAD_COMMAND.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_reload_command(mut self, command: impl Into<String>) -> Self {
        self.reload_command = command.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Switches traffic by rewriting a service's nginx upstream include and
/// reloading.
///
/// One switch serves any number of services. A commit only ever touches the
/// committing service's file, so other services keep their routing.
pub struct NginxUpstreamSwitch {
    config: NginxSwitchConfig,
    program: String,
    args: Vec<String>,
}

impl NginxUpstreamSwitch {
    pub fn new(config: NginxSwitchConfig) -> SwitchResult<Self> {
        let mut parts = config.reload_command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| SwitchError::Configuration("reload command is empty".into()))?;
        let args = parts.collect();

        Ok(Self {
            config,
            program,
            args,
        })
    }

    pub fn upstream_dir(&self) -> &Path {
        &self.config.upstream_dir
    }

    /// Include file holding `service`'s upstream block.
    pub fn upstream_file(&self, service: &str) -> PathBuf {
        self.config.upstream_dir.join(format!("{}.conf", service))
    }

    fn temp_path(&self, service: &str) -> PathBuf {
        self.config.upstream_dir.join(format!(".{}.conf.tmp", service))
    }

    async fn read_current(&self, path: &Path) -> SwitchResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, service: &str, content: &str) -> SwitchResult<()> {
        tokio::fs::create_dir_all(&self.config.upstream_dir).await?;

        let tmp = self.temp_path(service);
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, self.upstream_file(service)).await?;
        Ok(())
    }

    async fn restore(&self, service: &str, previous: Option<String>) -> SwitchResult<()> {
        match previous {
            Some(content) => self.write_atomic(service, &content).await,
            None => match tokio::fs::remove_file(self.upstream_file(service)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }

    async fn reload(&self) -> SwitchResult<()> {
        let command = self.config.reload_command.clone();
        debug!(command = %command, "Reloading proxy");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.config.timeout, cmd.output())
            .await
            .map_err(|_| SwitchError::Timeout {
                command: command.clone(),
                timeout_ms: self.config.timeout.as_millis() as u64,
            })?
            .map_err(|e| SwitchError::ReloadFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(SwitchError::ReloadFailed {
                command,
                reason: match output.status.code() {
                    Some(code) => format!("exit code {}: {}", code, stderr),
                    None => format!("terminated by signal: {}", stderr),
                },
            })
        }
    }
}

#[async_trait]
impl TrafficSwitch for NginxUpstreamSwitch {
    fn name(&self) -> &str {
        "nginx"
    }

    async fn commit(
        &self,
        service: &str,
        env: &EnvName,
        environment: &Environment,
    ) -> SwitchResult<()> {
        let path = self.upstream_file(service);
        let previous = self.read_current(&path).await?;
        let rendered = render_upstream(service, env, environment.port);

        self.write_atomic(service, &rendered).await?;

        if let Err(e) = self.reload().await {
            warn!(
                service,
                env = %env,
                error = %e,
                "Proxy reload failed, restoring previous upstream"
            );
            if let Err(restore_err) = self.restore(service, previous).await {
                error!(
                    service,
                    file = %path.display(),
                    error = %restore_err,
                    "Failed to restore previous upstream file"
                );
            }
            return Err(e);
        }

        info!(
            service,
            env = %env,
            port = environment.port,
            file = %path.display(),
            "Traffic switched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn green() -> Environment {
        Environment::new(3002, "1.1.0", "/srv/api/green")
    }

    fn switch(dir: &TempDir, reload: &str) -> NginxUpstreamSwitch {
        NginxUpstreamSwitch::new(
            NginxSwitchConfig::new(dir.path())
                .with_reload_command(reload)
                .with_timeout(Duration::from_millis(500)),
        )
        .unwrap()
    }

    #[test]
    fn test_render_upstream() {
        let block = render_upstream("api", &EnvName::green(), 3002);
        assert!(block.contains("upstream api {"));
        assert!(block.contains("server 127.0.0.1:3002;"));
    }

    #[test]
    fn test_upstream_file_per_service() {
        let switch = NginxUpstreamSwitch::new(NginxSwitchConfig::new("/etc/nginx/cutover")).unwrap();
        assert_eq!(
            switch.upstream_file("api"),
            PathBuf::from("/etc/nginx/cutover/api.conf")
        );
        assert_ne!(switch.upstream_file("api"), switch.upstream_file("web"));
    }

    #[test]
    fn test_empty_reload_command_rejected() {
        let result = NginxUpstreamSwitch::new(NginxSwitchConfig::new("conf.d").with_reload_command("  "));
        assert!(matches!(result, Err(SwitchError::Configuration(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_commit_writes_upstream() {
        let dir = TempDir::new().unwrap();
        let switch = switch(&dir, "true");

        switch.commit("api", &EnvName::green(), &green()).await.unwrap();

        let content = std::fs::read_to_string(switch.upstream_file("api")).unwrap();
        assert!(content.contains("server 127.0.0.1:3002;"));
        assert!(!dir.path().join(".api.conf.tmp").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_services_keep_separate_upstreams() {
        let dir = TempDir::new().unwrap();
        let switch = switch(&dir, "true");

        switch.commit("api", &EnvName::green(), &green()).await.unwrap();
        switch
            .commit(
                "web",
                &EnvName::green(),
                &Environment::new(4002, "2.0.0", "/srv/web/green"),
            )
            .await
            .unwrap();

        let api = std::fs::read_to_string(switch.upstream_file("api")).unwrap();
        let web = std::fs::read_to_string(switch.upstream_file("web")).unwrap();
        assert!(api.contains("upstream api {"));
        assert!(api.contains("server 127.0.0.1:3002;"));
        assert!(web.contains("upstream web {"));
        assert!(web.contains("server 127.0.0.1:4002;"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_reload_restores_previous() {
        let dir = TempDir::new().unwrap();
        let previous = render_upstream("api", &EnvName::blue(), 3001);
        std::fs::write(dir.path().join("api.conf"), &previous).unwrap();

        let switch = switch(&dir, "false");
        let result = switch.commit("api", &EnvName::green(), &green()).await;

        assert!(matches!(result, Err(SwitchError::ReloadFailed { .. })));
        let content = std::fs::read_to_string(switch.upstream_file("api")).unwrap();
        assert_eq!(content, previous);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_reload_without_previous_removes_file() {
        let dir = TempDir::new().unwrap();
        let switch = switch(&dir, "false");

        assert!(switch.commit("api", &EnvName::green(), &green()).await.is_err());
        assert!(!switch.upstream_file("api").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reload_timeout() {
        let dir = TempDir::new().unwrap();
        let switch = switch(&dir, "sleep 5");

        let result = switch.commit("api", &EnvName::green(), &green()).await;
        assert!(matches!(result, Err(SwitchError::Timeout { timeout_ms: 500, .. })));
    }

    #[tokio::test]
    async fn test_missing_reload_binary() {
        let dir = TempDir::new().unwrap();
        let switch = switch(&dir, "definitely-not-a-real-nginx-binary -s reload");

        let result = switch.commit("api", &EnvName::green(), &green()).await;
        assert!(matches!(result, Err(SwitchError::ReloadFailed { .. })));
        assert!(!switch.upstream_file("api").exists());
    }
}
