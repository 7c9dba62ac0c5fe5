//! TOML-based CheckpointRepository implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use specloom_core::checkpoint::{Checkpoint, CheckpointRepository};
use specloom_core::error::{Result, SpecloomError};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk shape of one session's history file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointLog {
    #[serde(default)]
    checkpoints: Vec<Checkpoint>,
}

/// Checkpoint store persisting each session's history as one TOML file.
///
/// Directory layout:
/// ```text
/// base_dir/
/// └── sessions/
///     ├── session-id-1.toml
///     └── session-id-2.toml
/// ```
///
/// Writes are atomic: the log is serialized to a temporary file in the
/// same directory and renamed over the target.
pub struct TomlCheckpointRepository {
    base_dir: PathBuf,
}

impl TomlCheckpointRepository {
    /// Creates a repository rooted at `base_dir`, creating the directory
    /// structure if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory structure cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("sessions"))?;
        Ok(Self { base_dir })
    }

    /// Creates a repository at the default location (~/.specloom).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// directory structure cannot be created.
    pub fn default_location() -> Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| SpecloomError::io("Failed to get home directory"))?;
        Self::new(home_dir.join(".specloom"))
    }

    fn session_file_path(&self, session_id: &str) -> Result<PathBuf> {
        // Session ids become file names; refuse anything that could
        // escape the sessions directory.
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.contains("..")
        {
            return Err(SpecloomError::validation(format!(
                "Invalid session id '{}'",
                session_id
            )));
        }
        Ok(self
            .base_dir
            .join("sessions")
            .join(format!("{}.toml", session_id)))
    }

    fn load_log(&self, session_id: &str) -> Result<CheckpointLog> {
        let path = self.session_file_path(session_id)?;
        if !path.exists() {
            return Ok(CheckpointLog::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    fn write_log(&self, session_id: &str, log: &CheckpointLog) -> Result<()> {
        let path = self.session_file_path(session_id)?;
        let content = toml::to_string_pretty(log)?;

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointRepository for TomlCheckpointRepository {
    async fn append(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut log = self.load_log(&checkpoint.session_id)?;
        log.checkpoints.push(checkpoint.clone());
        self.write_log(&checkpoint.session_id, &log)?;
        tracing::debug!(
            "[{}] Persisted checkpoint {} ({} total)",
            checkpoint.session_id,
            checkpoint.id,
            log.checkpoints.len()
        );
        Ok(())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let log = self.load_log(session_id)?;
        Ok(log.checkpoints.into_iter().last())
    }

    async fn list(&self, session_id: &str) -> Result<Vec<Checkpoint>> {
        Ok(self.load_log(session_id)?.checkpoints)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let path = self.session_file_path(session_id)?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specloom_core::session::SessionState;
    use specloom_core::step::StepId;
    use tempfile::TempDir;

    fn checkpoint(session_id: &str, step: StepId, completion: u8) -> Checkpoint {
        let mut state = SessionState::new(session_id);
        state.completion_percentage = completion;
        Checkpoint::capture(step, state)
    }

    #[tokio::test]
    async fn test_round_trip_preserves_state() {
        let dir = TempDir::new().unwrap();
        let repo = TomlCheckpointRepository::new(dir.path()).unwrap();

        repo.append(&checkpoint("s-1", StepId::Analyze, 0)).await.unwrap();
        repo.append(&checkpoint("s-1", StepId::CheckCompletion, 30))
            .await
            .unwrap();

        let latest = repo.latest("s-1").await.unwrap().unwrap();
        assert_eq!(latest.step, StepId::CheckCompletion);
        assert_eq!(latest.state.completion_percentage, 30);

        let history = repo.list("s-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].step, StepId::Analyze);
    }

    #[tokio::test]
    async fn test_missing_session_yields_empty() {
        let dir = TempDir::new().unwrap();
        let repo = TomlCheckpointRepository::new(dir.path()).unwrap();

        assert!(repo.latest("missing").await.unwrap().is_none());
        assert!(repo.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_session_removes_file() {
        let dir = TempDir::new().unwrap();
        let repo = TomlCheckpointRepository::new(dir.path()).unwrap();

        repo.append(&checkpoint("s-1", StepId::Analyze, 0)).await.unwrap();
        repo.delete_session("s-1").await.unwrap();
        assert!(repo.list("s-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_session_ids() {
        let dir = TempDir::new().unwrap();
        let repo = TomlCheckpointRepository::new(dir.path()).unwrap();

        let err = repo.list("../escape").await.unwrap_err();
        assert!(matches!(err, SpecloomError::Validation(_)));
    }
}
