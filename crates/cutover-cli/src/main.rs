//! Cutover CLI
//!
//! Operator entry point for blue-green cutover:
//!
//! ```text
//! cutover init api --blue-port 3001 --green-port 3002
//! cutover promote api green v1.4.2
//! cutover rollback api
//! cutover status api --output json
//! cutover watchdog --url http://127.0.0.1:8080/health
//! ```
//!
//! Exit code 0 means the requested state was reached (or already held).
//! Any failure exits 1 and prints the failure reason; with `--output json`
//! the reason is written to stdout as `{"success": false, "reason": ...}`.

#![deny(unsafe_code)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cutover_types::BOOTSTRAP_VERSION;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod context;
mod error;
mod output;

use commands::init::InitArgs;
use config::CutoverConfig;
use error::{CliError, CliResult};
use output::{print_failure, print_json, OutputFormat};

/// Cutover - blue-green cutover and rollback
#[derive(Parser)]
#[command(name = "cutover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "CUTOVER_CONFIG")]
    config: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines on stderr
    #[arg(long, global = true, env = "CUTOVER_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch traffic back to the inactive environment
    Rollback {
        /// Service name
        service: String,
    },

    /// Deploy a version to an environment and switch traffic to it
    Promote {
        /// Service name
        service: String,

        /// Target environment (blue or green)
        env: String,

        /// Version now installed in the target environment
        version: String,

        /// Replace the environment's install path
        #[arg(long)]
        path: Option<String>,
    },

    /// Show the live environment and recent transitions
    Status {
        /// Service name
        service: String,

        /// History records to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Provision the state record for a new service
    Init {
        /// Service name
        service: String,

        #[arg(long, default_value = "3001")]
        blue_port: u16,

        #[arg(long, default_value = "3002")]
        green_port: u16,

        /// Version recorded for both environments
        #[arg(long, default_value = BOOTSTRAP_VERSION)]
        version: String,

        /// Base directory holding the blue/ and green/ installs
        #[arg(long)]
        path: Option<String>,
    },

    /// Poll the platform health endpoint and restart the fleet on failure
    Watchdog {
        /// Health endpoint (overrides watchdog.url)
        #[arg(long)]
        url: Option<String>,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli, config: CutoverConfig) -> CliResult<()> {
    let format = cli.output;
    match cli.command {
        Commands::Rollback { service } => commands::rollback::execute(&service, &config, format).await,
        Commands::Promote {
            service,
            env,
            version,
            path,
        } => {
            commands::promote::execute(&service, &env, &version, path.as_deref(), &config, format)
                .await
        }
        Commands::Status { service, limit } => {
            commands::status::execute(&service, limit, &config, format).await
        }
        Commands::Init {
            service,
            blue_port,
            green_port,
            version,
            path,
        } => {
            let args = InitArgs {
                service: &service,
                blue_port,
                green_port,
                version: &version,
                path: path.as_deref(),
            };
            commands::init::execute(args, &config, format).await
        }
        Commands::Watchdog { url } => commands::watchdog::execute(url, &config).await,
        Commands::Config => {
            print_json(&config);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.output;

    let config = match CutoverConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            print_failure(&CliError::from(e), format);
            return ExitCode::FAILURE;
        }
    };

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    init_tracing(level, cli.log_json || config.logging.json);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            print_failure(&e, format);
            ExitCode::FAILURE
        }
    }
}
