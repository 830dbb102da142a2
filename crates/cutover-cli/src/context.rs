//! Builds the engine and its collaborators from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use cutover_engine::{CutoverEngine, EngineConfig};
use cutover_health::{HealthProber, HttpHealthProber};
use cutover_state::{JsonFileStateStore, StateStore};
use cutover_supervisor::{Pm2Supervisor, ProcessSupervisor, SystemdSupervisor};
use cutover_switch::{NginxSwitchConfig, NginxUpstreamSwitch, RecordingSwitch, TrafficSwitch};
use tracing::warn;

use crate::config::{CutoverConfig, SupervisorKind, SwitchKind};
use crate::error::{CliError, CliResult};

/// Service names end up in file names and unit names.
pub fn validate_service(service: &str) -> CliResult<()> {
    let valid = !service.is_empty()
        && service
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !service.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!(
            "service name {:?} may only contain letters, digits, '-', '_' and '.'",
            service
        )))
    }
}

pub fn build_store(config: &CutoverConfig, service: &str) -> Arc<dyn StateStore> {
    Arc::new(JsonFileStateStore::new(&config.state.dir, service))
}

/// Supervisor for `service`, or for the whole fleet when `service` is None.
pub fn build_supervisor(config: &CutoverConfig, service: Option<&str>) -> Arc<dyn ProcessSupervisor> {
    let settings = &config.supervisor;
    match settings.kind {
        SupervisorKind::Pm2 => {
            let mut pm2 = match &settings.binary {
                Some(binary) => Pm2Supervisor::with_binary(binary, settings.command_timeout()),
                None => Pm2Supervisor::new(settings.command_timeout()),
            };
            if let Some(ecosystem) = &settings.ecosystem {
                pm2 = pm2.with_ecosystem(ecosystem);
            }
            Arc::new(pm2)
        }
        SupervisorKind::Systemd => {
            let units = if settings.units.is_empty() {
                service
                    .map(|s| vec![format!("{}-blue", s), format!("{}-green", s)])
                    .unwrap_or_default()
            } else {
                settings.units.clone()
            };
            let systemd = SystemdSupervisor::new(units, settings.command_timeout());
            if settings.user {
                Arc::new(systemd.user())
            } else {
                Arc::new(systemd)
            }
        }
    }
}

/// Supervisor driving the watchdog's full-stack restart.
pub fn build_fleet_supervisor(config: &CutoverConfig) -> anyhow::Result<Arc<dyn ProcessSupervisor>> {
    if config.supervisor.kind == SupervisorKind::Systemd && config.supervisor.units.is_empty() {
        bail!("supervisor.units must list the fleet's units when supervisor.kind = \"systemd\"");
    }
    Ok(build_supervisor(config, None))
}

pub fn build_prober(config: &CutoverConfig) -> anyhow::Result<Arc<dyn HealthProber>> {
    let prober = HttpHealthProber::new(config.health.probe_config())
        .context("failed to build health prober")?;
    Ok(Arc::new(prober))
}

pub fn build_switch(config: &CutoverConfig) -> anyhow::Result<Arc<dyn TrafficSwitch>> {
    let settings = &config.switch;
    match settings.kind {
        SwitchKind::Nginx => {
            let Some(upstream_dir) = &settings.upstream_dir else {
                bail!("switch.upstream_dir is required when switch.kind = \"nginx\"");
            };
            let switch = NginxUpstreamSwitch::new(
                NginxSwitchConfig::new(upstream_dir)
                    .with_reload_command(&settings.reload_command)
                    .with_timeout(Duration::from_secs(settings.timeout_secs)),
            )
            .context("failed to build nginx switch")?;
            Ok(Arc::new(switch))
        }
        SwitchKind::None => {
            warn!("No traffic switch configured, commits will only be logged");
            Ok(Arc::new(RecordingSwitch::new()))
        }
    }
}

pub fn engine_config(config: &CutoverConfig) -> EngineConfig {
    EngineConfig::default()
        .with_history_limit(config.state.history_limit)
        .with_start_policy(config.supervisor.start_policy())
        .with_health_retries(config.health.attempts, config.health.interval())
        .with_health_path(&config.health.path)
}

pub fn build_engine(config: &CutoverConfig, service: &str) -> CliResult<CutoverEngine> {
    validate_service(service)?;
    Ok(CutoverEngine::new(
        build_store(config, service),
        build_supervisor(config, Some(service)),
        build_prober(config)?,
        build_switch(config)?,
        engine_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert!(validate_service("api").is_ok());
        assert!(validate_service("billing-api_v2.eu").is_ok());
        assert!(validate_service("").is_err());
        assert!(validate_service("../etc").is_err());
        assert!(validate_service("a b").is_err());
        assert!(validate_service(".hidden").is_err());
    }

    #[test]
    fn test_nginx_requires_upstream_dir() {
        let mut config = CutoverConfig::default();
        config.switch.kind = SwitchKind::Nginx;
        let err = build_switch(&config).err().unwrap();
        assert!(err.to_string().contains("upstream_dir"));
    }

    #[test]
    fn test_nginx_switch_from_settings() {
        let mut config = CutoverConfig::default();
        config.switch.kind = SwitchKind::Nginx;
        config.switch.upstream_dir = Some("/etc/nginx/cutover".into());
        assert_eq!(build_switch(&config).unwrap().name(), "nginx");
    }

    #[test]
    fn test_engine_config_from_settings() {
        let mut config = CutoverConfig::default();
        config.state.history_limit = 7;
        config.health.attempts = 0;
        config.health.path = "/ready".into();

        let engine = engine_config(&config);
        assert_eq!(engine.history_limit, 7);
        assert_eq!(engine.health_attempts, 1);
        assert_eq!(engine.health_path, "/ready");
    }

    #[test]
    fn test_build_engine_rejects_bad_service() {
        let config = CutoverConfig::default();
        assert!(matches!(
            build_engine(&config, "bad/name"),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_systemd_fleet_requires_units() {
        let mut config = CutoverConfig::default();
        config.supervisor.kind = SupervisorKind::Systemd;
        let err = build_fleet_supervisor(&config).err().unwrap();
        assert!(err.to_string().contains("supervisor.units"));

        config.supervisor.units = vec!["api-blue".into(), "api-green".into()];
        assert!(build_fleet_supervisor(&config).is_ok());
    }

    #[test]
    fn test_pm2_fleet_needs_no_units() {
        let config = CutoverConfig::default();
        assert_eq!(build_fleet_supervisor(&config).unwrap().name(), "pm2");
    }

    #[test]
    fn test_systemd_supervisor_name() {
        let mut config = CutoverConfig::default();
        config.supervisor.kind = SupervisorKind::Systemd;
        assert_eq!(build_supervisor(&config, Some("api")).name(), "systemd");
    }
}
