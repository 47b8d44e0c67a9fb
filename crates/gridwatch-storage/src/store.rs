//! Durable agent-state storage.
//!
//! One JSON record per agent, loaded at startup and atomically rewritten
//! after every mutating operation. The trait seam allows a database-backed
//! store to replace the file store without touching agent logic.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use gridwatch_core::state::AgentState;

use crate::error::{Result, StorageError};

/// Atomic load/save of the agent-state aggregate.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state.
    ///
    /// Falls back to a fresh default state when no record exists or the
    /// record is unreadable, logging a warning. Never fails the startup
    /// path.
    async fn load(&self) -> AgentState;

    /// Persist the state.
    ///
    /// The write is atomic: a crash mid-save never leaves a torn record
    /// visible to a subsequent load.
    async fn save(&self, state: &AgentState) -> Result<()>;
}

/// JSON file implementation of [`StateStore`].
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers only ever observe a complete record.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut os = self.path.as_os_str().to_owned();
        os.push(".tmp");
        PathBuf::from(os)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> AgentState {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<AgentState>(&bytes) {
                Ok(state) => {
                    info!(path = %self.path.display(), "agent state loaded");
                    state
                }
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        error = %e,
                        "agent state unreadable, starting with defaults"
                    );
                    AgentState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no existing agent state, starting fresh");
                AgentState::default()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to read agent state, starting with defaults"
                );
                AgentState::default()
            }
        }
    }

    async fn save(&self, state: &AgentState) -> Result<()> {
        if self.path.file_name().is_none() {
            return Err(StorageError::InvalidPath(self.path.display().to_string()));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &self.path).await?;
        info!(path = %self.path.display(), "agent state saved");
        Ok(())
    }
}

/// In-memory [`StateStore`] for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStateStore {
    state: tokio::sync::RwLock<Option<AgentState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> AgentState {
        self.state.read().await.clone().unwrap_or_default()
    }

    async fn save(&self, state: &AgentState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}

/// A [`StateStore`] whose saves always fail.
///
/// Lets tests exercise the save-failure path, where the in-memory state
/// stays correct but the caller is told the change did not survive.
pub struct FailingStateStore;

#[async_trait]
impl StateStore for FailingStateStore {
    async fn load(&self) -> AgentState {
        AgentState::default()
    }

    async fn save(&self, _state: &AgentState) -> Result<()> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "simulated disk failure",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridwatch_core::types::GridSnapshot;
    use std::collections::HashMap;

    fn sample_state() -> AgentState {
        let mut state = AgentState::default();
        state.thresholds.high_loading = 88.0;
        state.push_snapshot(GridSnapshot::from_lines(Utc::now(), HashMap::new()));
        state
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        let state = sample_state();
        store.save(&state).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded.thresholds, state.thresholds);
        assert_eq!(loaded.history.len(), state.history.len());
        assert_eq!(loaded.action_history.len(), state.action_history.len());
    }

    #[tokio::test]
    async fn load_missing_file_yields_default() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nope.json"));

        let loaded = store.load().await;
        assert_eq!(loaded.thresholds, gridwatch_core::Thresholds::default());
        assert!(loaded.history.is_empty());
    }

    #[tokio::test]
    async fn load_corrupt_file_yields_default() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = FileStateStore::new(&path);
        let loaded = store.load().await;
        assert!(loaded.history.is_empty());
    }

    #[tokio::test]
    async fn save_creates_parent_directory() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/deeper/state.json"));

        store.save(&sample_state()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn save_rejects_path_without_file_name() {
        init_tracing();
        let store = FileStateStore::new("..");
        let err = store.save(&AgentState::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn interrupted_write_leaves_prior_state_loadable() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = FileStateStore::new(&path);

        let state = sample_state();
        store.save(&state).await.unwrap();

        // Simulate a crash mid-write: a half-written temp file next to the
        // completed record.
        tokio::fs::write(path.with_extension("json.tmp"), b"{\"history\": [")
            .await
            .unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.thresholds, state.thresholds);
        assert_eq!(loaded.history.len(), 1);
    }
}
