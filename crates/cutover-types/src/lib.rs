//! Cutover shared data model
//!
//! Types shared by every cutover crate: the two deployment slots of a
//! logical service, the persisted [`DeploymentState`] aggregate and the
//! bounded transition history.
//!
//! ## Persisted layout
//!
//! ```json
//! {
//!   "service": "api",
//!   "active_env": "blue",
//!   "environments": {
//!     "blue":  { "port": 3001, "version": "v1.0.0", "path": "/srv/api/blue" },
//!     "green": { "port": 3002, "version": "v1.1.0", "path": "/srv/api/green" }
//!   },
//!   "history": []
//! }
//! ```

#![deny(unsafe_code)]

pub mod environment;
pub mod error;
pub mod history;
pub mod state;

pub use environment::{EnvName, Environment, DEFAULT_HEALTH_PATH};
pub use error::ValidationError;
pub use history::{FailureReason, TransitionAction, TransitionRecord, TransitionStatus};
pub use state::{DeploymentState, BOOTSTRAP_VERSION, DEFAULT_HISTORY_LIMIT};
