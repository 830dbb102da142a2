//! Validation errors for the deployment state aggregate.

use crate::environment::EnvName;
use thiserror::Error;

/// Invariant violations detected while building or loading a state record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service name must not be empty")]
    EmptyService,

    #[error("expected exactly 2 environments, found {0}")]
    EnvironmentCount(usize),

    #[error("active environment '{0}' is not defined")]
    ActiveNotDefined(EnvName),

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(EnvName),

    #[error("port {0} is assigned to more than one environment")]
    DuplicatePort(u16),

    #[error("record belongs to service '{found}', expected '{expected}'")]
    ServiceMismatch { expected: String, found: String },
}
