//! Checkpoint repository trait.
//!
//! Defines the interface for durable checkpoint history, decoupling the
//! session manager from the specific storage mechanism (in-memory map,
//! TOML files, a database).

use super::model::Checkpoint;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for ordered checkpoint history, keyed by session id.
///
/// # Implementation Notes
///
/// Implementations must preserve insertion order per session and treat
/// stored checkpoints as immutable. History is append-only; there is no
/// update operation by design.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Appends a checkpoint to its session's history.
    async fn append(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Returns the most recent checkpoint for a session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(checkpoint))`: session exists
    /// - `Ok(None)`: no checkpoint recorded for this session
    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// Returns the full history for a session, oldest first.
    ///
    /// Sessions with no history yield an empty list, not an error.
    async fn list(&self, session_id: &str) -> Result<Vec<Checkpoint>>;

    /// Removes a session's entire history.
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}
