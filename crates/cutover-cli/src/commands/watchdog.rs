//! Watchdog command: run the fleet watchdog in the foreground.

use cutover_watchdog::FleetWatchdog;

use crate::commands::interrupt;
use crate::config::CutoverConfig;
use crate::context;
use crate::error::CliResult;
use crate::output::print_info;

pub async fn execute(url: Option<String>, config: &CutoverConfig) -> CliResult<()> {
    let mut settings = config.watchdog.to_config();
    if let Some(url) = url {
        settings.url = url;
    }

    let supervisor = context::build_fleet_supervisor(config)?;

    print_info(&format!(
        "Watching {} every {}s (Ctrl-C to stop)",
        settings.url,
        settings.interval.as_secs()
    ));

    let mut watchdog = FleetWatchdog::new(settings, supervisor)?;
    watchdog.run_until(interrupt()).await?;
    Ok(())
}
