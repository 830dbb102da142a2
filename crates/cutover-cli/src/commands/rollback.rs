//! Rollback command

use crate::commands::interrupt;
use crate::config::CutoverConfig;
use crate::context;
use crate::error::CliResult;
use crate::output::{print_transition, OutputFormat};

/// Move traffic back to the inactive environment.
pub async fn execute(service: &str, config: &CutoverConfig, format: OutputFormat) -> CliResult<()> {
    let engine = context::build_engine(config, service)?;
    let report = engine.rollback_to_previous_until(interrupt()).await?;
    print_transition(&report, config.switch.kind, format);
    Ok(())
}
