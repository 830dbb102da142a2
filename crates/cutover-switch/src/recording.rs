//! In-memory switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use cutover_types::{EnvName, Environment};
use tracing::info;

use crate::error::{SwitchError, SwitchResult};
use crate::switch::TrafficSwitch;

/// One commit seen by a [`RecordingSwitch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub service: String,
    pub env: EnvName,
    pub port: u16,
}

/// Switch that only records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingSwitch {
    commits: Mutex<Vec<CommitRecord>>,
    fail: AtomicBool,
}

impl RecordingSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail (nothing is recorded).
    pub fn fail_commits(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn commits(&self) -> Vec<CommitRecord> {
        self.commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl TrafficSwitch for RecordingSwitch {
    fn name(&self) -> &str {
        "recording"
    }

    async fn commit(
        &self,
        service: &str,
        env: &EnvName,
        environment: &Environment,
    ) -> SwitchResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SwitchError::Rejected("injected commit failure".into()));
        }

        info!(service, env = %env, port = environment.port, "Recorded traffic switch");
        self.commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CommitRecord {
                service: service.to_string(),
                env: env.clone(),
                port: environment.port,
            });
        Ok(())
    }
}
