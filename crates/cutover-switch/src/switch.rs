//! Traffic switch trait.

use async_trait::async_trait;
use cutover_types::{EnvName, Environment};

use crate::error::SwitchResult;

/// Routes a service's new connections to one environment.
#[async_trait]
pub trait TrafficSwitch: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Point all new connections for `service` at `environment`.
    ///
    /// Implementations must either fully apply the change or leave the
    /// previous routing in place.
    async fn commit(
        &self,
        service: &str,
        env: &EnvName,
        environment: &Environment,
    ) -> SwitchResult<()>;
}
