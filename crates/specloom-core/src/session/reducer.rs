//! The state reducer: merges a partial update into session state.
//!
//! Per-field strategies:
//!
//! | field                          | strategy                                  |
//! |--------------------------------|-------------------------------------------|
//! | messages                       | append, preserving order                  |
//! | iteration_count                | additive (base + delta)                   |
//! | spec_sections                  | per-key overwrite, non-empty values only  |
//! | last_command                   | clear wins, else overwrite if present     |
//! | everything else                | overwrite if present, else retain base    |
//!
//! The merge is total over all declared fields, never removes a field, and
//! is intentionally **not** idempotent for the iteration counter.

use super::model::SessionState;
use super::update::StateUpdate;

/// Folds `partial` into `base`, returning the merged state.
pub fn merge(mut base: SessionState, partial: StateUpdate) -> SessionState {
    // Append-only history: entries are never truncated or reordered.
    base.messages.extend(partial.messages);

    base.iteration_count += partial.iteration_delta;

    // Section proposals land per key; an empty proposal never clobbers an
    // already-filled section.
    for (section, content) in partial.section_proposals {
        if !content.trim().is_empty() {
            base.spec_sections.insert(section, content);
        }
    }

    if partial.clear_command {
        base.last_command = None;
    } else if let Some(command) = partial.command {
        base.last_command = Some(command);
    }

    if let Some(repositories) = partial.selected_repositories {
        base.selected_repositories = repositories;
    }
    if let Some(profile) = partial.user_profile {
        base.user_profile = profile;
    }
    if let Some(snippets) = partial.code_context {
        base.code_context = snippets;
    }
    if let Some(summary) = partial.feature_summary {
        base.feature_summary = summary;
    }
    if let Some(complexity) = partial.feature_complexity {
        base.feature_complexity = Some(complexity);
    }
    if let Some(completion) = partial.completion_percentage {
        base.completion_percentage = completion.min(100);
    }
    if let Some(report) = partial.tech_debt_report {
        base.tech_debt_report = Some(report);
    }
    if let Some(report) = partial.security_report {
        base.security_report = Some(report);
    }
    if let Some(diagram) = partial.diagram {
        base.diagram = Some(diagram);
    }
    if let Some(multi_spec) = partial.multi_spec {
        base.multi_spec = Some(multi_spec);
    }
    if let Some(preview_ready) = partial.preview_ready {
        base.preview_ready = preview_ready;
    }
    if let Some(step) = partial.current_step {
        base.current_step = Some(step);
    }
    if let Some(error) = partial.last_error {
        base.last_error = Some(error);
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::command::UserCommand;
    use crate::session::message::ConversationMessage;
    use crate::session::section::SpecSection;
    use crate::step::StepId;
    use std::collections::BTreeMap;

    fn base() -> SessionState {
        SessionState::new("s-1")
    }

    #[test]
    fn test_messages_append_in_order() {
        let state = merge(
            base(),
            StateUpdate {
                messages: vec![
                    ConversationMessage::user("first"),
                    ConversationMessage::assistant("second"),
                ],
                ..Default::default()
            },
        );
        let state = merge(
            state,
            StateUpdate {
                messages: vec![ConversationMessage::user("third")],
                ..Default::default()
            },
        );

        let contents: Vec<_> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_iteration_counter_is_additive_not_idempotent() {
        let update = StateUpdate {
            iteration_delta: 1,
            ..Default::default()
        };
        let state = merge(base(), update.clone());
        let state = merge(state, update);
        assert_eq!(state.iteration_count, 2);
    }

    #[test]
    fn test_empty_section_proposal_never_clears_filled_section() {
        let filled = "A properly detailed description of the feature.";
        let mut state = base();
        state
            .spec_sections
            .insert(SpecSection::Description, filled.to_string());

        let mut proposals = BTreeMap::new();
        proposals.insert(SpecSection::Description, "   ".to_string());
        proposals.insert(SpecSection::UserStory, "As a user, I log in.".to_string());

        let state = merge(
            state,
            StateUpdate {
                section_proposals: proposals,
                ..Default::default()
            },
        );

        assert_eq!(state.spec_sections[&SpecSection::Description], filled);
        assert_eq!(
            state.spec_sections[&SpecSection::UserStory],
            "As a user, I log in."
        );
    }

    #[test]
    fn test_scalars_overwrite_only_when_present() {
        let mut state = base();
        state.feature_summary = "old summary".to_string();
        state.completion_percentage = 40;

        let state = merge(
            state,
            StateUpdate {
                feature_summary: Some("new summary".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(state.feature_summary, "new summary");
        // Untouched by the partial: retained.
        assert_eq!(state.completion_percentage, 40);
    }

    #[test]
    fn test_completion_is_clamped_to_100() {
        let state = merge(
            base(),
            StateUpdate {
                completion_percentage: Some(250),
                ..Default::default()
            },
        );
        assert_eq!(state.completion_percentage, 100);
    }

    #[test]
    fn test_clear_command_wins_over_set() {
        let mut state = base();
        state.last_command = Some(UserCommand::Export);

        let state = merge(
            state,
            StateUpdate {
                command: Some(UserCommand::Cancel),
                clear_command: true,
                ..Default::default()
            },
        );
        assert_eq!(state.last_command, None);
    }

    #[test]
    fn test_current_step_and_error_overwrite() {
        let state = merge(base(), StateUpdate::degraded(StepId::Analyze, "boom"));
        assert_eq!(state.current_step, Some(StepId::Analyze));
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        // Degraded update leaves everything else at its base value.
        assert_eq!(state.completion_percentage, 0);
        assert!(state.messages.is_empty());
    }
}
