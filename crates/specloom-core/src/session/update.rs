//! Typed partial state updates.
//!
//! Every step executor returns a `StateUpdate` describing only the fields it
//! touched. The reducer folds the update into session state with a fixed
//! per-field strategy (see [`super::reducer`]).

use super::command::UserCommand;
use super::message::ConversationMessage;
use super::model::UserProfile;
use super::report::{Diagram, MultiSpecBreakdown, SecurityReport, TechDebtReport};
use super::section::SpecSection;
use crate::capability::CodeSnippet;
use crate::step::StepId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partial update to session state.
///
/// `Default` is the empty update; the reducer treats `None`/empty fields as
/// "retain base".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Messages to append to the history, in order.
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    /// Added to the iteration counter. Deliberately additive: re-applying
    /// the same update accumulates, so each update is applied exactly once.
    #[serde(default)]
    pub iteration_delta: u32,
    /// Proposed section content; empty proposals are dropped by the reducer.
    #[serde(default)]
    pub section_proposals: BTreeMap<SpecSection, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repositories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
    /// Sets the one-shot command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<UserCommand>,
    /// Consumes the one-shot command; wins over `command`.
    #[serde(default)]
    pub clear_command: bool,
    /// Replaces the retrieved-context list wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_context: Option<Vec<CodeSnippet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_complexity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_debt_report: Option<TechDebtReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_report: Option<SecurityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<Diagram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_spec: Option<MultiSpecBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_ready: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl StateUpdate {
    /// Empty update stamped with the producing step.
    pub fn at_step(step: StepId) -> Self {
        Self {
            current_step: Some(step),
            ..Default::default()
        }
    }

    /// Degraded update for a failed step: carries the error indicator and
    /// safe defaults (everything else untouched).
    pub fn degraded(step: StepId, error: impl Into<String>) -> Self {
        Self {
            current_step: Some(step),
            last_error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Update that only consumes the pending command.
    pub fn consume_command() -> Self {
        Self {
            clear_command: true,
            ..Default::default()
        }
    }
}
