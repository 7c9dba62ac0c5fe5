//! Optional analysis report models.
//!
//! These are the structured outputs of the four optional workflow steps.
//! Fields default where the language capability may omit them.

use serde::{Deserialize, Serialize};

/// Maximum number of sub-specs a multi-spec breakdown may carry.
pub const MAX_SUB_SPECS: usize = 4;

/// A single tech-debt finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechDebtIssue {
    /// code_smell, performance, security, testability, coupling,
    /// best_practices or documentation.
    #[serde(default)]
    pub category: String,
    /// critical, medium or low.
    #[serde(default)]
    pub severity: String,
    /// Location in the codebase, e.g. "src/auth.rs:42".
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// How to resolve the issue.
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub effort_hours: f32,
}

/// Result of the tech-debt analysis step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechDebtReport {
    #[serde(default)]
    pub issues: Vec<TechDebtIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Set when the capability failed and the report is degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TechDebtReport {
    /// Empty report carrying only a failure indicator.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            issues: Vec::new(),
            recommendation: None,
            error: Some(error.into()),
        }
    }
}

/// A single security checklist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityCheck {
    /// Category such as data_protection, owasp or api.
    #[serde(default)]
    pub category: String,
    /// critical, high, medium or low.
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub check_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// pass, warning or fail.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub recommendation: String,
}

/// Result of the security checklist step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    #[serde(default)]
    pub checks: Vec<SecurityCheck>,
    /// Overall status: pass, warning or fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SecurityReport {
    /// Empty report carrying only a failure indicator.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            checks: Vec::new(),
            overall_status: None,
            error: Some(error.into()),
        }
    }
}

/// Supported diagram flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagramKind {
    #[serde(rename = "flowchart")]
    Flowchart,
    #[serde(rename = "sequenceDiagram")]
    Sequence,
    #[serde(rename = "classDiagram")]
    Class,
    #[serde(rename = "erDiagram")]
    EntityRelation,
}

impl Default for DiagramKind {
    fn default() -> Self {
        Self::Flowchart
    }
}

/// A generated diagram: one type plus its source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(default)]
    pub kind: DiagramKind,
    /// Diagram source text (e.g. Mermaid).
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One proposed per-repository sub-spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSpec {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub title: String,
    /// CORE, INTEGRATION, UI_ONLY or CONFIG.
    #[serde(default)]
    pub change_type: String,
    #[serde(default)]
    pub effort_days: f32,
    /// Repositories this sub-spec depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Result of the multi-spec detection step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiSpecBreakdown {
    #[serde(default)]
    pub should_split: bool,
    #[serde(default)]
    pub affected_repositories: Vec<String>,
    #[serde(default)]
    pub specs: Vec<SubSpec>,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MultiSpecBreakdown {
    /// Caps the sub-spec list at [`MAX_SUB_SPECS`], appending a note to the
    /// rationale when entries were dropped. Returns whether truncation
    /// happened.
    pub fn enforce_cap(&mut self) -> bool {
        if self.specs.len() <= MAX_SUB_SPECS {
            return false;
        }
        self.specs.truncate(MAX_SUB_SPECS);
        self.rationale
            .push_str(" (limited to 4 specs for simplicity)");
        true
    }

    /// Empty breakdown carrying only a failure indicator.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub_spec(repository: &str) -> SubSpec {
        SubSpec {
            repository: repository.to_string(),
            title: format!("Feature - {}", repository),
            change_type: "CORE".to_string(),
            effort_days: 2.0,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_enforce_cap_truncates_and_annotates() {
        let mut breakdown = MultiSpecBreakdown {
            should_split: true,
            specs: (0..6).map(|i| sub_spec(&format!("repo-{}", i))).collect(),
            rationale: "six repos touched".to_string(),
            ..Default::default()
        };

        assert!(breakdown.enforce_cap());
        assert_eq!(breakdown.specs.len(), MAX_SUB_SPECS);
        assert!(breakdown.rationale.contains("limited to 4"));
    }

    #[test]
    fn test_enforce_cap_leaves_small_lists_alone() {
        let mut breakdown = MultiSpecBreakdown {
            specs: vec![sub_spec("a"), sub_spec("b")],
            rationale: "two repos".to_string(),
            ..Default::default()
        };

        assert!(!breakdown.enforce_cap());
        assert_eq!(breakdown.specs.len(), 2);
        assert_eq!(breakdown.rationale, "two repos");
    }
}
