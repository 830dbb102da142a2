//! Deployment slots

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health path used when an environment carries no explicit URL.
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Name of a deployment slot, conventionally `blue` or `green`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvName(String);

impl EnvName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn blue() -> Self {
        Self::new("blue")
    }

    pub fn green() -> Self {
        Self::new("green")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl AsRef<str> for EnvName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One deployment slot of a logical service.
///
/// The slot name is the key under which the environment is stored in
/// [`DeploymentState`](crate::DeploymentState).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Port the instance listens on; unique per service.
    pub port: u16,

    /// Opaque version/build tag, replaced on each promote.
    pub version: String,

    /// Entry point of the deployable artifact.
    pub path: String,

    /// Explicit readiness URL overriding the derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_url: Option<String>,
}

impl Environment {
    pub fn new(port: u16, version: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            port,
            version: version.into(),
            path: path.into(),
            health_url: None,
        }
    }

    pub fn with_health_url(mut self, url: impl Into<String>) -> Self {
        self.health_url = Some(url.into());
        self
    }

    /// Readiness URL: the explicit one, or `http://127.0.0.1:<port><path>`.
    pub fn health_url(&self, health_path: &str) -> String {
        match &self.health_url {
            Some(url) => url.clone(),
            None => format!("http://127.0.0.1:{}{}", self.port, health_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_health_url() {
        let env = Environment::new(3002, "v1.1.0", "/srv/api/green");
        assert_eq!(
            env.health_url(DEFAULT_HEALTH_PATH),
            "http://127.0.0.1:3002/health"
        );
    }

    #[test]
    fn test_explicit_health_url_wins() {
        let env = Environment::new(3002, "v1.1.0", "/srv/api/green")
            .with_health_url("http://green.internal/ready");
        assert_eq!(env.health_url("/ignored"), "http://green.internal/ready");
    }

    #[test]
    fn test_env_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&EnvName::green()).unwrap();
        assert_eq!(json, "\"green\"");
    }
}
