//! Checkpoint domain model.

use crate::session::model::SessionState;
use crate::step::StepId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable snapshot of session state after one step execution.
///
/// Checkpoints are never mutated once created; per session they form a
/// strict total order matching execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique checkpoint identifier (UUID v4).
    pub id: String,
    /// Session this snapshot belongs to.
    pub session_id: String,
    /// Step whose execution produced the snapshot.
    pub step: StepId,
    /// Creation timestamp (ISO 8601 format).
    pub created_at: String,
    /// The full merged session state at this point.
    pub state: SessionState,
}

impl Checkpoint {
    /// Captures a snapshot of `state` as produced by `step`.
    pub fn capture(step: StepId, state: SessionState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: state.session_id.clone(),
            step,
            created_at: Utc::now().to_rfc3339(),
            state,
        }
    }

    /// Listing view of this checkpoint.
    pub fn summary(&self) -> CheckpointSummary {
        CheckpointSummary {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            step: self.step,
            completion: self.state.completion_percentage,
        }
    }
}

/// Compact checkpoint description for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub id: String,
    pub created_at: String,
    pub step: StepId,
    pub completion: u8,
}
