//! # Cutover Engine - Blue-green cutover and rollback
//!
//! The engine moves live traffic for one service between its two
//! environments. Every transition walks the same pipeline:
//!
//! ```text
//! IDLE → VERIFYING_PROCESS → CHECKING_HEALTH → SWITCHING → COMMITTED
//!              │                    │
//!              ▼                    ▼
//!    ABORTED(process_failed) ABORTED(health_failed)
//! ```
//!
//! ## Guarantees
//!
//! - Traffic never moves to an environment that is not online and healthy
//! - An aborted transition leaves `active_env` untouched and appends a
//!   `failed` history record with a machine-parsable reason
//! - Only one transition per service runs at a time; a concurrent caller
//!   is rejected with [`CutoverError::ConcurrentTransitionRejected`]
//! - Once the traffic switch is asked to commit, the commit and the state
//!   save run to completion even if the caller stops waiting
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cutover_engine::{CutoverEngine, EngineConfig};
//! use cutover_health::{HttpHealthProber, HttpProbeConfig};
//! use cutover_state::JsonFileStateStore;
//! use cutover_supervisor::Pm2Supervisor;
//! use cutover_switch::RecordingSwitch;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CutoverEngine::new(
//!     Arc::new(JsonFileStateStore::new("/var/lib/cutover", "api")),
//!     Arc::new(Pm2Supervisor::new(Duration::from_secs(10))),
//!     Arc::new(HttpHealthProber::new(HttpProbeConfig::default())?),
//!     Arc::new(RecordingSwitch::new()),
//!     EngineConfig::default(),
//! );
//!
//! let report = engine.rollback_to_previous().await?;
//! println!("{} is now live", report.to_env);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod phase;
pub mod report;

pub use config::EngineConfig;
pub use engine::CutoverEngine;
pub use error::{CutoverError, CutoverResult};
pub use phase::{TransitionAttempt, TransitionPhase};
pub use report::{StatusReport, TransitionReport};
