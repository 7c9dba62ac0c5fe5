//! Session domain model.
//!
//! This module contains the core `SessionState` entity: the accumulated
//! state of one specification-authoring conversation. A session is fed
//! through the workflow engine, merged step by step via the reducer, and
//! snapshotted into checkpoints after every executed step.

use super::command::UserCommand;
use super::message::{ConversationMessage, MessageRole};
use super::report::{Diagram, MultiSpecBreakdown, SecurityReport, TechDebtReport};
use super::section::{SpecSection, TOTAL_SECTIONS};
use crate::capability::CodeSnippet;
use crate::step::StepId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// User profile driving the assistant's conversational register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserProfile {
    /// Developer / tech lead: precise, technical guidance.
    Technical,
    /// Product / business stakeholder: plain language, outcome-first.
    NonTechnical,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::Technical
    }
}

/// Complete state of one specification-authoring session.
///
/// The message history is append-only, the iteration counter is monotonic,
/// and the spec map is keyed by the closed [`SpecSection`] enum. All
/// mutation goes through [`super::reducer::merge`]; nothing outside the
/// reducer writes these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Unique session identifier; immutable for the session's lifetime.
    pub session_id: String,
    /// Profile used to pick the response instruction template.
    #[serde(default)]
    pub user_profile: UserProfile,
    /// Ordered repository identifiers selected for this session.
    #[serde(default)]
    pub selected_repositories: Vec<String>,
    /// One-shot command; consumed by the engine at the wait-input router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_command: Option<UserCommand>,
    /// Append-only conversation history.
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    /// Retrieved code snippets; each retrieval replaces the whole list.
    #[serde(default)]
    pub code_context: Vec<CodeSnippet>,
    /// Extracted feature description.
    #[serde(default)]
    pub feature_summary: String,
    /// Complexity score 1-5, when the analysis produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_complexity: Option<u8>,
    /// Section content; absent or short entries count as unfilled.
    #[serde(default)]
    pub spec_sections: BTreeMap<SpecSection, String>,
    /// 0-100; recomputed only by the completion-check step.
    #[serde(default)]
    pub completion_percentage: u8,
    /// Number of generated responses; never decreases.
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_debt_report: Option<TechDebtReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_report: Option<SecurityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<Diagram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_spec: Option<MultiSpecBreakdown>,
    /// Set once completion reaches the preview threshold.
    #[serde(default)]
    pub preview_ready: bool,
    /// Step that produced the most recent update (debugging aid).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepId>,
    /// Error indicator carried by the most recent degraded update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SessionState {
    /// Creates a fresh session: empty history, no sections, 0% complete.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_profile: UserProfile::default(),
            selected_repositories: Vec::new(),
            last_command: None,
            messages: Vec::new(),
            code_context: Vec::new(),
            feature_summary: String::new(),
            feature_complexity: None,
            spec_sections: BTreeMap::new(),
            completion_percentage: 0,
            iteration_count: 0,
            tech_debt_report: None,
            security_report: None,
            diagram: None,
            multi_spec: None,
            preview_ready: false,
            current_step: None,
            last_error: None,
        }
    }

    /// Number of sections whose content passes the filled threshold.
    pub fn filled_sections(&self) -> usize {
        self.spec_sections
            .values()
            .filter(|content| SpecSection::is_filled(content))
            .count()
    }

    /// Whether the spec is complete enough to preview/export.
    pub fn is_complete(&self) -> bool {
        self.completion_percentage >= 80
    }

    /// Content of the most recent assistant message, if any.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Content of the most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }

    /// The last `count` messages, oldest first.
    pub fn recent_messages(&self, count: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }
}

/// Compile-time companion of the ten-section invariant: the map can only be
/// keyed by `SpecSection`, so the only dynamic check left is completeness.
pub fn all_sections_filled(state: &SessionState) -> bool {
    state.filled_sections() == TOTAL_SECTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let state = SessionState::new("s-1");
        assert_eq!(state.session_id, "s-1");
        assert_eq!(state.user_profile, UserProfile::Technical);
        assert_eq!(state.completion_percentage, 0);
        assert_eq!(state.iteration_count, 0);
        assert!(state.messages.is_empty());
        assert!(state.spec_sections.is_empty());
    }

    #[test]
    fn test_filled_sections_ignores_short_content() {
        let mut state = SessionState::new("s-1");
        state
            .spec_sections
            .insert(SpecSection::Description, "short".to_string());
        state.spec_sections.insert(
            SpecSection::UserStory,
            "As a user, I want to log in with my email.".to_string(),
        );
        assert_eq!(state.filled_sections(), 1);
    }

    #[test]
    fn test_recent_messages_bounds() {
        let mut state = SessionState::new("s-1");
        for i in 0..3 {
            state
                .messages
                .push(ConversationMessage::user(format!("m{}", i)));
        }
        assert_eq!(state.recent_messages(5).len(), 3);
        assert_eq!(state.recent_messages(2)[0].content, "m1");
    }
}
