//! The fixed set of specification sections.
//!
//! A spec is complete when all ten sections carry substantive content.
//! Keying the section map by this enum (rather than free strings) makes it
//! impossible for session state to carry an unknown section.

use serde::{Deserialize, Serialize};

/// Total number of sections in the specification template.
pub const TOTAL_SECTIONS: usize = 10;

/// Minimum content length in characters (exclusive) for a section to
/// count as filled.
pub const FILLED_THRESHOLD: usize = 20;

/// One of the ten sections of the feature specification template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecSection {
    /// Problem statement and business/technical context.
    Description,
    /// As [role], I want [action], so that [benefit].
    UserStory,
    /// Deliverables: scripts, features, reports.
    ExpectedOutcome,
    /// Technical implementation details, APIs, data flow.
    TechnicalScope,
    /// Step-by-step subtasks for implementation.
    TaskChecklist,
    /// What must work for acceptance.
    AcceptanceCriteria,
    /// Completion criteria: merged, tested, documented.
    DefinitionOfDone,
    /// Notes, decisions, suggestions.
    AdditionalNotes,
    /// Documentation, APIs, RFCs.
    References,
    /// Risks, dependencies, constraints.
    Risks,
}

impl SpecSection {
    /// All sections in template order.
    pub const ALL: [SpecSection; TOTAL_SECTIONS] = [
        SpecSection::Description,
        SpecSection::UserStory,
        SpecSection::ExpectedOutcome,
        SpecSection::TechnicalScope,
        SpecSection::TaskChecklist,
        SpecSection::AcceptanceCriteria,
        SpecSection::DefinitionOfDone,
        SpecSection::AdditionalNotes,
        SpecSection::References,
        SpecSection::Risks,
    ];

    /// Stable key used in prompts and serialized state.
    pub fn key(&self) -> &'static str {
        match self {
            SpecSection::Description => "description",
            SpecSection::UserStory => "user_story",
            SpecSection::ExpectedOutcome => "expected_outcome",
            SpecSection::TechnicalScope => "technical_scope",
            SpecSection::TaskChecklist => "task_checklist",
            SpecSection::AcceptanceCriteria => "acceptance_criteria",
            SpecSection::DefinitionOfDone => "definition_of_done",
            SpecSection::AdditionalNotes => "additional_notes",
            SpecSection::References => "references",
            SpecSection::Risks => "risks",
        }
    }

    /// Parses a section key; returns `None` for anything outside the ten.
    pub fn from_key(key: &str) -> Option<Self> {
        SpecSection::ALL.iter().copied().find(|s| s.key() == key)
    }

    /// Human-readable title for display.
    pub fn title(&self) -> &'static str {
        match self {
            SpecSection::Description => "Description / Context",
            SpecSection::UserStory => "User Story",
            SpecSection::ExpectedOutcome => "Expected Outcome",
            SpecSection::TechnicalScope => "Technical Details / Scope",
            SpecSection::TaskChecklist => "Task Checklist",
            SpecSection::AcceptanceCriteria => "Acceptance Criteria",
            SpecSection::DefinitionOfDone => "Definition of Done",
            SpecSection::AdditionalNotes => "Additional Notes",
            SpecSection::References => "References / Useful Links",
            SpecSection::Risks => "Risks or Limitations",
        }
    }

    /// Whether the given content counts as a filled section. Counted in
    /// characters, not bytes, so multi-byte scripts are not over-weighted.
    pub fn is_filled(content: &str) -> bool {
        content.chars().count() > FILLED_THRESHOLD
    }
}

impl std::fmt::Display for SpecSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_keys_parse_back() {
        for section in SpecSection::ALL {
            assert_eq!(SpecSection::from_key(section.key()), Some(section));
        }
        assert_eq!(SpecSection::from_key("unknown_section"), None);
    }

    #[test]
    fn test_filled_threshold_is_exclusive() {
        assert!(!SpecSection::is_filled(&"x".repeat(20)));
        assert!(SpecSection::is_filled(&"x".repeat(21)));
        assert!(!SpecSection::is_filled(""));
    }

    #[test]
    fn test_filled_threshold_counts_characters_not_bytes() {
        // 10 characters, 30 bytes: still unfilled.
        assert!(!SpecSection::is_filled(&"機".repeat(10)));
        assert!(SpecSection::is_filled(&"機".repeat(21)));
    }
}
