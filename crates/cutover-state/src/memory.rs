//! In-memory backend for tests and embedding.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use cutover_types::DeploymentState;
use tokio::sync::RwLock;

use crate::error::{StateError, StateResult};
use crate::store::StateStore;

/// In-memory state store.
///
/// Load and save failures can be injected to exercise the engine's
/// fail-fast and consistency-alarm paths.
pub struct InMemoryStateStore {
    service: String,
    state: RwLock<Option<DeploymentState>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryStateStore {
    /// Create an empty store for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            state: RwLock::new(None),
            fail_loads: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// Create a store pre-populated with `state`.
    pub fn with_state(state: DeploymentState) -> Self {
        Self {
            state: RwLock::new(Some(state.clone())),
            ..Self::new(state.service().to_string())
        }
    }

    /// Make every subsequent `load` fail.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current record without going through the trait.
    pub async fn snapshot(&self) -> Option<DeploymentState> {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    fn service(&self) -> &str {
        &self.service
    }

    async fn load(&self) -> StateResult<DeploymentState> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StateError::Unavailable("injected load failure".into()));
        }
        self.state
            .read()
            .await
            .clone()
            .ok_or_else(|| StateError::NotFound(self.service.clone()))
    }

    async fn save(&self, state: &DeploymentState) -> StateResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StateError::Unavailable("injected save failure".into()));
        }
        *self.state.write().await = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
