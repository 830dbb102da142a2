//! # Cutover Health - Readiness probes for candidate environments
//!
//! A probe is a single bounded-timeout HTTP GET against an environment's
//! readiness URL. It is classified as:
//!
//! - **Healthy**: HTTP 200 and a JSON body whose `status` field equals the
//!   expected marker (`{"status":"healthy"}` by default)
//! - **Unhealthy**: anything else: non-200, wrong or missing marker,
//!   timeout, connection error
//!
//! Probes never retry and have no side effects. Retry policy belongs to the
//! caller (the cutover engine).
//!
//! ## Example
//!
//! ```rust,no_run
//! use cutover_health::{HealthProber, HttpHealthProber, HttpProbeConfig};
//! use cutover_types::EnvName;
//!
//! # async fn example() -> Result<(), cutover_health::HealthError> {
//! let prober = HttpHealthProber::new(HttpProbeConfig::default())?;
//! let report = prober.check(&EnvName::green(), "http://127.0.0.1:3002/health").await;
//! println!("{}: {}", report.env, report.outcome);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod http;
pub mod probe;
pub mod static_prober;

pub use error::{HealthError, HealthResult};
pub use http::{HttpHealthProber, HttpProbeConfig, DEFAULT_EXPECTED_STATUS, DEFAULT_PROBE_TIMEOUT};
pub use probe::{HealthOutcome, HealthProber, ProbeReport, UnhealthyReason};
pub use static_prober::StaticProber;
