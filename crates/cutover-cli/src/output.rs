//! Output formatting utilities

use colored::*;
use cutover_engine::{StatusReport, TransitionReport};
use cutover_types::{EnvName, Environment, TransitionRecord};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::config::SwitchKind;
use crate::error::CliError;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and messages
    #[default]
    Table,
    /// JSON on stdout
    Json,
}

/// Print a vector of rows in the specified format
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => print_json(&data),
    }
}

/// Print a single value as JSON
pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("failed to encode output: {}", e)),
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[derive(Serialize)]
struct FailureOutput<'a> {
    success: bool,
    reason: &'a str,
    error: String,
}

/// Report a failed command. JSON output goes to stdout so scripts can parse
/// the reason.
pub fn print_failure(err: &CliError, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FailureOutput {
            success: false,
            reason: err.reason(),
            error: err.to_string(),
        }),
        OutputFormat::Table => print_error(&format!("{} [{}]", err, err.reason())),
    }
}

#[derive(Serialize)]
struct TransitionOutput<'a> {
    #[serde(flatten)]
    report: &'a TransitionReport,
    traffic_switch: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

/// Warning shown when a committed transition did not touch any proxy.
pub fn unrouted_warning(report: &TransitionReport, switch: SwitchKind) -> Option<String> {
    (report.changed && switch == SwitchKind::None).then(|| {
        format!(
            "no traffic switch configured (switch.kind = \"none\"): {} was recorded live but no proxy was updated",
            report.to_env
        )
    })
}

pub fn print_transition(report: &TransitionReport, switch: SwitchKind, format: OutputFormat) {
    let warning = unrouted_warning(report, switch);
    match format {
        OutputFormat::Json => print_json(&TransitionOutput {
            report,
            traffic_switch: switch.as_str(),
            warning,
        }),
        OutputFormat::Table if !report.changed => print_warning(&format!(
            "{}: {} is already active ({}), nothing to do",
            report.service, report.to_env, report.version
        )),
        OutputFormat::Table => {
            print_success(&format!(
                "{}: {} {} -> {} ({})",
                report.service, report.action, report.from_env, report.to_env, report.version
            ));
            if let Some(warning) = warning {
                print_warning(&warning);
            }
        }
    }
}

/// Table row for an environment
#[derive(Debug, Serialize, Tabled)]
pub struct EnvironmentRow {
    env: String,
    live: String,
    port: u16,
    version: String,
    path: String,
}

impl EnvironmentRow {
    pub fn new(name: &EnvName, env: &Environment, active: &EnvName) -> Self {
        Self {
            env: name.to_string(),
            live: if name == active { "*".into() } else { String::new() },
            port: env.port,
            version: env.version.clone(),
            path: env.path.clone(),
        }
    }
}

/// Table row for a history record
#[derive(Debug, Serialize, Tabled)]
pub struct HistoryRow {
    time: String,
    action: String,
    from: String,
    to: String,
    status: String,
    reason: String,
    details: String,
}

impl From<&TransitionRecord> for HistoryRow {
    fn from(record: &TransitionRecord) -> Self {
        Self {
            time: record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            action: record.action.to_string(),
            from: record.from_env.to_string(),
            to: record.to_env.to_string(),
            status: record.status.to_string(),
            reason: record.reason.map(|r| r.to_string()).unwrap_or_default(),
            details: record.details.clone(),
        }
    }
}

pub fn print_status(status: &StatusReport, format: OutputFormat) {
    if let OutputFormat::Json = format {
        print_json(status);
        return;
    }

    match status.active() {
        Some(env) => print_info(&format!(
            "{}: {} is live ({} on port {})",
            status.service, status.active_env, env.version, env.port
        )),
        None => print_warning(&format!(
            "{}: active environment {} is not defined",
            status.service, status.active_env
        )),
    }

    let envs: Vec<EnvironmentRow> = status
        .environments
        .iter()
        .map(|(name, env)| EnvironmentRow::new(name, env, &status.active_env))
        .collect();
    print_output(envs, format);

    if status.history.is_empty() {
        println!("{}", "No transitions recorded".dimmed());
    } else {
        let history: Vec<HistoryRow> = status.history.iter().map(HistoryRow::from).collect();
        print_output(history, format);
    }
}
