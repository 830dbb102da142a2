//! Promote command

use cutover_types::EnvName;

use crate::commands::interrupt;
use crate::config::CutoverConfig;
use crate::context;
use crate::error::CliResult;
use crate::output::{print_transition, OutputFormat};

/// Record a new version for `env` and cut traffic over to it.
pub async fn execute(
    service: &str,
    env: &str,
    version: &str,
    path: Option<&str>,
    config: &CutoverConfig,
    format: OutputFormat,
) -> CliResult<()> {
    let engine = context::build_engine(config, service)?;
    let report = engine
        .promote_until(&EnvName::new(env), version, path, interrupt())
        .await?;
    print_transition(&report, config.switch.kind, format);
    Ok(())
}
