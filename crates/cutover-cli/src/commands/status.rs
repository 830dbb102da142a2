//! Status command
//!
//! Reads the store directly. No supervisor, prober or proxy is contacted,
//! so status works on hosts where those are not configured.

use cutover_engine::StatusReport;

use crate::config::CutoverConfig;
use crate::context;
use crate::error::CliResult;
use crate::output::{print_status, OutputFormat};

pub async fn execute(
    service: &str,
    limit: usize,
    config: &CutoverConfig,
    format: OutputFormat,
) -> CliResult<()> {
    context::validate_service(service)?;
    let state = context::build_store(config, service).load().await?;
    print_status(&StatusReport::from_state(&state, limit), format);
    Ok(())
}
