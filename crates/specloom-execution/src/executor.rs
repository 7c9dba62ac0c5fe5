//! Step executor trait.

use async_trait::async_trait;
use specloom_core::error::Result;
use specloom_core::session::{SessionState, StateUpdate};
use specloom_core::step::StepId;

/// A unit of work in the workflow.
///
/// An executor reads session state (and possibly an external capability)
/// and produces a partial update. Executors that call capabilities are
/// expected to degrade gracefully themselves where the contract says so;
/// any `Err` that still escapes is caught by the engine and converted into
/// a degraded update, so a single step's failure never aborts the run.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// The step this executor implements.
    fn id(&self) -> StepId;

    /// Runs the step against the current state.
    async fn execute(&self, state: &SessionState) -> Result<StateUpdate>;
}
