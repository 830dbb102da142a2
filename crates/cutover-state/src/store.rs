//! Storage trait definition.

use async_trait::async_trait;
use cutover_types::DeploymentState;
use tracing::info;

use crate::error::{StateError, StateResult};

/// Guard for the store-level transition lock.
///
/// Backends without cross-process locking hand out an empty guard. The file
/// backend keeps the locked file handle here; dropping the guard closes the
/// handle and releases the advisory lock.
#[derive(Debug)]
pub struct StoreLock {
    file: Option<std::fs::File>,
}

impl StoreLock {
    /// A guard that holds nothing.
    pub fn unlocked() -> Self {
        Self { file: None }
    }

    pub(crate) fn held(file: std::fs::File) -> Self {
        Self { file: Some(file) }
    }

    /// Whether this guard holds an OS-level lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

/// Durable record of one service's deployment state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Service this store persists.
    fn service(&self) -> &str;

    /// Load the current record.
    ///
    /// Returns [`StateError::NotFound`] if the service was never provisioned.
    async fn load(&self) -> StateResult<DeploymentState>;

    /// Replace the record atomically.
    async fn save(&self, state: &DeploymentState) -> StateResult<()>;

    /// Take the store-level transition lock without waiting.
    ///
    /// Returns [`StateError::Locked`] on contention.
    async fn try_lock(&self) -> StateResult<StoreLock> {
        Ok(StoreLock::unlocked())
    }

    /// Check whether a record exists.
    async fn exists(&self) -> StateResult<bool> {
        match self.load().await {
            Ok(_) => Ok(true),
            Err(StateError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Persist `state` unless a record already exists.
///
/// Returns `true` if the record was created.
pub async fn provision(store: &dyn StateStore, state: &DeploymentState) -> StateResult<bool> {
    let _lock = store.try_lock().await?;
    if store.exists().await? {
        return Ok(false);
    }
    state.validate().map_err(|source| StateError::Corrupt {
        service: state.service().to_string(),
        source,
    })?;
    store.save(state).await?;
    info!(
        service = state.service(),
        active_env = %state.active_env(),
        "Deployment state provisioned"
    );
    Ok(true)
}
