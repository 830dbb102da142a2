//! # Cutover Switch - Point-of-no-return traffic cutover
//!
//! A [`TrafficSwitch`] moves all new connections for a service onto one
//! environment. Once `commit` returns `Ok`, the transition is logically
//! complete; callers never retry a failed commit in-line.
//!
//! ## Implementations
//!
//! - [`NginxUpstreamSwitch`]: rewrites an nginx `upstream` block atomically
//!   and reloads the proxy, restoring the previous block if the reload fails
//! - [`RecordingSwitch`]: records commits in memory (no proxy in front, or tests)

#![deny(unsafe_code)]

pub mod error;
pub mod nginx;
pub mod recording;
pub mod switch;

pub use error::{SwitchError, SwitchResult};
pub use nginx::{render_upstream, NginxSwitchConfig, NginxUpstreamSwitch, DEFAULT_RELOAD_COMMAND};
pub use recording::{CommitRecord, RecordingSwitch};
pub use switch::TrafficSwitch;
