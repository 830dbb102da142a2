//! # Cutover Supervisor - Process manager adapters
//!
//! Queries and controls the OS-level processes behind each environment.
//! The cutover engine only sees the [`ProcessSupervisor`] trait, so the
//! concrete manager (pm2, systemd, a test double) can be swapped without
//! touching the engine.
//!
//! ## Naming convention
//!
//! The process behind environment `<env>` of service `<service>` is named
//! `<service>-<env>` (see [`process_name`]).
//!
//! ## Status semantics
//!
//! - [`ProcessStatus::Online`]: the manager reports the process running
//! - [`ProcessStatus::Offline`]: known to the manager but not running, or absent
//! - [`ProcessStatus::Unknown`]: the manager could not be queried; callers
//!   must treat this as a hard failure, never as online
//!
//! ## Example
//!
//! ```rust,no_run
//! use cutover_supervisor::{Pm2Supervisor, ProcessSpec, ProcessSupervisor, StartPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), cutover_supervisor::SupervisorError> {
//! let supervisor = Pm2Supervisor::new(Duration::from_secs(10));
//! let spec = ProcessSpec::new("api-green", "/srv/api/green/server.js", 3002);
//! supervisor.ensure_running(&spec, &StartPolicy::default()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod command;
pub mod error;
pub mod pm2;
pub mod process;
pub mod static_supervisor;
pub mod supervisor;
pub mod systemd;

pub use error::{SupervisorError, SupervisorResult};
pub use pm2::Pm2Supervisor;
pub use process::{process_name, ProcessEntry, ProcessSpec, ProcessStatus};
pub use static_supervisor::StaticSupervisor;
pub use supervisor::{ProcessSupervisor, StartPolicy};
pub use systemd::SystemdSupervisor;
