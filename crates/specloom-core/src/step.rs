//! Workflow step identifiers.
//!
//! Step identifiers are a closed enum so that routing tables and edge
//! definitions are exhaustively checked at compile time, instead of being
//! keyed by string literals.

use serde::{Deserialize, Serialize};

/// Identifier of a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Analyze the feature request and extract goal, complexity, questions.
    Analyze,
    /// Retrieve code-context snippets for the selected repositories.
    RetrieveContext,
    /// Generate the profile-adapted assistant reply.
    GenerateResponse,
    /// Propose content for unfilled spec sections.
    UpdateSpec,
    /// Recompute the completion percentage.
    CheckCompletion,
    /// Resumable pause point; waits for the next user invocation.
    WaitInput,
    /// Optional: tech-debt analysis report.
    TechDebt,
    /// Optional: security checklist report.
    Security,
    /// Optional: diagram source generation.
    Diagram,
    /// Optional: multi-repository spec breakdown.
    MultiSpec,
}

impl StepId {
    /// Stable name used for logging and checkpoint listings.
    pub fn name(&self) -> &'static str {
        match self {
            StepId::Analyze => "analyze",
            StepId::RetrieveContext => "retrieve_context",
            StepId::GenerateResponse => "generate_response",
            StepId::UpdateSpec => "update_spec",
            StepId::CheckCompletion => "check_completion",
            StepId::WaitInput => "wait_input",
            StepId::TechDebt => "tech_debt",
            StepId::Security => "security",
            StepId::Diagram => "diagram",
            StepId::MultiSpec => "multi_spec",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Target of a workflow transition: another step, or the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Next {
    Step(StepId),
    End,
}

impl std::fmt::Display for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Next::Step(step) => write!(f, "{}", step),
            Next::End => f.write_str("__end__"),
        }
    }
}
