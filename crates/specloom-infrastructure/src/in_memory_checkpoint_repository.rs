//! In-memory CheckpointRepository implementation.

use async_trait::async_trait;
use specloom_core::checkpoint::{Checkpoint, CheckpointRepository};
use specloom_core::error::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Checkpoint store backed by a process-local map.
///
/// History is lost on shutdown; intended for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryCheckpointRepository {
    histories: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointRepository for InMemoryCheckpointRepository {
    async fn append(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut histories = self.histories.write().await;
        histories
            .entry(checkpoint.session_id.clone())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let histories = self.histories.read().await;
        Ok(histories
            .get(session_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn list(&self, session_id: &str) -> Result<Vec<Checkpoint>> {
        let histories = self.histories.read().await;
        Ok(histories.get(session_id).cloned().unwrap_or_default())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut histories = self.histories.write().await;
        histories.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specloom_core::session::SessionState;
    use specloom_core::step::StepId;

    fn checkpoint(session_id: &str, step: StepId) -> Checkpoint {
        Checkpoint::capture(step, SessionState::new(session_id))
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let repo = InMemoryCheckpointRepository::new();
        repo.append(&checkpoint("s-1", StepId::Analyze)).await.unwrap();
        repo.append(&checkpoint("s-1", StepId::RetrieveContext))
            .await
            .unwrap();

        let history = repo.list("s-1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].step, StepId::Analyze);
        assert_eq!(history[1].step, StepId::RetrieveContext);

        let latest = repo.latest("s-1").await.unwrap().unwrap();
        assert_eq!(latest.step, StepId::RetrieveContext);
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty_not_error() {
        let repo = InMemoryCheckpointRepository::new();
        assert!(repo.latest("missing").await.unwrap().is_none());
        assert!(repo.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_session_clears_history() {
        let repo = InMemoryCheckpointRepository::new();
        repo.append(&checkpoint("s-1", StepId::Analyze)).await.unwrap();
        repo.append(&checkpoint("s-2", StepId::Analyze)).await.unwrap();

        repo.delete_session("s-1").await.unwrap();
        assert!(repo.list("s-1").await.unwrap().is_empty());
        assert_eq!(repo.list("s-2").await.unwrap().len(), 1);
    }
}
