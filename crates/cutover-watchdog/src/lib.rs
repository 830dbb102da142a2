//! # Cutover Watchdog - Platform-wide liveness guard
//!
//! Polls one platform health endpoint on a fixed interval. After
//! `failure_threshold` consecutive failed polls (non-200 or unreachable) it
//! restarts the whole stack through the process supervisor: stop all,
//! wait, start all.
//!
//! A failed restart is fatal. [`FleetWatchdog::run`] returns
//! [`WatchdogError::RestartFailed`] instead of trying again, so a broken
//! host does not end up in a restart storm.
//!
//! The watchdog never touches deployment state or the cutover engine.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod watchdog;

pub use config::WatchdogConfig;
pub use error::{WatchdogError, WatchdogResult};
pub use watchdog::{FleetWatchdog, TickOutcome};
