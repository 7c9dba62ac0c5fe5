//! User-triggered commands for explicit workflow control.

use crate::error::SpecloomError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An explicit command attached to an invocation.
///
/// Commands are one-shot: the engine consumes a command the first time the
/// wait-input router inspects it, and it is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserCommand {
    /// Continue the conversation loop.
    Continue,
    /// Trigger tech-debt analysis.
    AnalyzeTechDebt,
    /// Trigger the security checklist.
    CheckSecurity,
    /// Generate a diagram for the feature.
    GenerateDiagram,
    /// Detect whether the feature should split into multiple specs.
    DetectMultiSpec,
    /// Preview the generated spec (stays at the pause point).
    PreviewSpec,
    /// Export the final spec and end the session.
    Export,
    /// Cancel the current operation and end the session.
    Cancel,
}

impl UserCommand {
    /// Stable wire name, matching the serde representation.
    pub fn name(&self) -> &'static str {
        match self {
            UserCommand::Continue => "continue",
            UserCommand::AnalyzeTechDebt => "analyze_tech_debt",
            UserCommand::CheckSecurity => "check_security",
            UserCommand::GenerateDiagram => "generate_diagram",
            UserCommand::DetectMultiSpec => "detect_multi_spec",
            UserCommand::PreviewSpec => "preview_spec",
            UserCommand::Export => "export",
            UserCommand::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for UserCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UserCommand {
    type Err = SpecloomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(UserCommand::Continue),
            "analyze_tech_debt" => Ok(UserCommand::AnalyzeTechDebt),
            "check_security" => Ok(UserCommand::CheckSecurity),
            "generate_diagram" => Ok(UserCommand::GenerateDiagram),
            "detect_multi_spec" => Ok(UserCommand::DetectMultiSpec),
            "preview_spec" => Ok(UserCommand::PreviewSpec),
            "export" => Ok(UserCommand::Export),
            "cancel" => Ok(UserCommand::Cancel),
            other => Err(SpecloomError::validation(format!(
                "Unknown command: '{}'",
                other
            ))),
        }
    }
}
