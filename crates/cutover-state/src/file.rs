//! JSON file backend.
//!
//! Layout under the state directory:
//!
//! - `<service>.json`: the live record
//! - `.<service>.json.tmp`: staging file for atomic saves
//! - `<service>.lock`: advisory lock held for the length of a transition

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cutover_types::{DeploymentState, ValidationError};
use fs2::FileExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::store::{StateStore, StoreLock};

/// File-backed state store, one JSON document per service.
pub struct JsonFileStateStore {
    service: String,
    dir: PathBuf,
}

impl JsonFileStateStore {
    /// Create a store for `service` rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            dir: dir.into(),
        }
    }

    /// Path of the live record.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.service))
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", self.service))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(format!("{}.lock", self.service))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    fn service(&self) -> &str {
        &self.service
    }

    async fn load(&self) -> StateResult<DeploymentState> {
        let contents = match tokio::fs::read_to_string(self.path()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::NotFound(self.service.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let state: DeploymentState = serde_json::from_str(&contents)
            .map_err(|e| StateError::Serialization(format!("deserialization failed: {}", e)))?;

        state.validate().map_err(|source| StateError::Corrupt {
            service: self.service.clone(),
            source,
        })?;

        if state.service() != self.service {
            return Err(StateError::Corrupt {
                service: self.service.clone(),
                source: ValidationError::ServiceMismatch {
                    expected: self.service.clone(),
                    found: state.service().to_string(),
                },
            });
        }

        Ok(state)
    }

    async fn save(&self, state: &DeploymentState) -> StateResult<()> {
        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| StateError::Serialization(format!("serialization failed: {}", e)))?;

        tokio::fs::create_dir_all(&self.dir).await?;

        // Atomic write: stage, sync, then rename over the live record
        let tmp_path = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, self.path()).await?;

        debug!(
            service = %self.service,
            active_env = %state.active_env(),
            history_len = state.history().len(),
            "Deployment state saved"
        );
        Ok(())
    }

    async fn try_lock(&self) -> StateResult<StoreLock> {
        let dir = self.dir.clone();
        let path = self.lock_path();
        let service = self.service.clone();

        tokio::task::spawn_blocking(move || lock_file(&dir, &path, &service))
            .await
            .map_err(|e| StateError::Unavailable(format!("lock task failed: {}", e)))?
    }
}

fn lock_file(dir: &Path, path: &Path, service: &str) -> StateResult<StoreLock> {
    std::fs::create_dir_all(dir)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => {
            // Owner PID for operators inspecting a stuck lock
            if let Err(e) = file.set_len(0).and_then(|()| writeln!(file, "{}", std::process::id())) {
                debug!(service = %service, error = %e, "Could not record lock owner");
            }
            debug!(service = %service, "Acquired state lock");
            Ok(StoreLock::held(file))
        }
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(StateError::Locked(service.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
