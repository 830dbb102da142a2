//! Init command: write the initial record for a service.

use cutover_types::{DeploymentState, EnvName, Environment};
use serde::Serialize;

use crate::config::CutoverConfig;
use crate::context;
use crate::error::{CliError, CliResult};
use crate::output::{print_json, print_success, print_warning, OutputFormat};

/// Slot layout for a new service.
#[derive(Debug, Clone)]
pub struct InitArgs<'a> {
    pub service: &'a str,
    pub blue_port: u16,
    pub green_port: u16,
    pub version: &'a str,
    /// Base directory; slots live in `<base>/blue` and `<base>/green`.
    pub path: Option<&'a str>,
}

#[derive(Serialize)]
struct InitOutput<'a> {
    service: &'a str,
    created: bool,
}

pub fn initial_state(args: &InitArgs<'_>) -> CliResult<DeploymentState> {
    let base = args
        .path
        .map(|p| p.trim_end_matches('/').to_string())
        .unwrap_or_else(|| format!("/srv/{}", args.service));
    let slot = |name: &EnvName, port: u16| {
        (
            name.clone(),
            Environment::new(port, args.version, format!("{}/{}", base, name)),
        )
    };

    DeploymentState::provision(
        args.service,
        [
            slot(&EnvName::blue(), args.blue_port),
            slot(&EnvName::green(), args.green_port),
        ],
        EnvName::blue(),
    )
    .map_err(|e| CliError::InvalidArgument(e.to_string()))
}

/// Create the record unless one already exists.
pub async fn execute(args: InitArgs<'_>, config: &CutoverConfig, format: OutputFormat) -> CliResult<()> {
    context::validate_service(args.service)?;
    let state = initial_state(&args)?;
    let store = context::build_store(config, args.service);
    let created = cutover_state::provision(store.as_ref(), &state).await?;

    match format {
        OutputFormat::Json => print_json(&InitOutput {
            service: args.service,
            created,
        }),
        OutputFormat::Table if created => print_success(&format!(
            "{}: provisioned blue on {} (active), green on {}",
            args.service, args.blue_port, args.green_port
        )),
        OutputFormat::Table => print_warning(&format!(
            "{}: already provisioned, left unchanged",
            args.service
        )),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args<'a>(path: Option<&'a str>) -> InitArgs<'a> {
        InitArgs {
            service: "api",
            blue_port: 3001,
            green_port: 3002,
            version: "v1.0.0",
            path,
        }
    }

    #[test]
    fn test_default_paths() {
        let state = initial_state(&args(None)).unwrap();
        assert_eq!(state.active_env(), &EnvName::blue());
        assert_eq!(state.environment(&EnvName::green()).unwrap().path, "/srv/api/green");
        assert_eq!(state.environment(&EnvName::blue()).unwrap().version, "v1.0.0");
    }

    #[test]
    fn test_custom_base_path() {
        let state = initial_state(&args(Some("/opt/api/"))).unwrap();
        assert_eq!(state.environment(&EnvName::blue()).unwrap().path, "/opt/api/blue");
    }

    #[test]
    fn test_same_port_rejected() {
        let mut bad = args(None);
        bad.green_port = bad.blue_port;
        assert!(matches!(initial_state(&bad), Err(CliError::InvalidArgument(_))));
    }
}
