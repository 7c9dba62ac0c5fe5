//! Checkpointing: immutable session-state snapshots and their store.

pub mod model;
pub mod repository;

pub use model::{Checkpoint, CheckpointSummary};
pub use repository::CheckpointRepository;
