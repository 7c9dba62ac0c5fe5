//! Command-triggered analysis steps.
//!
//! These never abort the session: a capability failure produces a degraded
//! report so the user sees what went wrong and can retry.

use crate::executor::StepExecutor;
use crate::prompts;
use async_trait::async_trait;
use serde::Deserialize;
use specloom_core::capability::{ChatMessage, CodeSearchCapability, LanguageCapability};
use specloom_core::error::Result;
use specloom_core::session::{
    ConversationMessage, Diagram, DiagramKind, MultiSpecBreakdown, SecurityReport, SessionState,
    StateUpdate, TechDebtReport,
};
use specloom_core::step::StepId;
use std::fmt::Write as _;
use std::sync::Arc;

/// Search queries for common debt indicators.
const DEBT_QUERIES: [&str; 3] = ["TODO", "FIXME", "deprecated"];
/// Hits per debt query per repository.
const DEBT_HITS_PER_QUERY: usize = 2;

fn spec_digest(state: &SessionState) -> String {
    let mut digest = format!("Feature: {}\n", state.feature_summary);
    for (section, content) in &state.spec_sections {
        let _ = writeln!(digest, "[{}]\n{}\n", section.key(), content);
    }
    digest
}

/// Scans the selected repositories for debt markers and asks the language
/// capability to assess them against the planned feature.
pub struct TechDebtStep {
    language: Arc<dyn LanguageCapability>,
    search: Arc<dyn CodeSearchCapability>,
}

impl TechDebtStep {
    pub fn new(
        language: Arc<dyn LanguageCapability>,
        search: Arc<dyn CodeSearchCapability>,
    ) -> Self {
        Self { language, search }
    }
}

#[async_trait]
impl StepExecutor for TechDebtStep {
    fn id(&self) -> StepId {
        StepId::TechDebt
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let mut evidence = String::new();
        for repository in &state.selected_repositories {
            for query in DEBT_QUERIES {
                match self
                    .search
                    .search(repository, query, DEBT_HITS_PER_QUERY)
                    .await
                {
                    Ok(hits) => {
                        for hit in hits {
                            let _ = writeln!(
                                evidence,
                                "{}:{}: {}",
                                hit.file,
                                hit.line.unwrap_or(0),
                                hit.content
                            );
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            "[{}] Debt scan '{}' in {} failed: {}",
                            state.session_id,
                            query,
                            repository,
                            err
                        );
                    }
                }
            }
        }

        let input = format!("{}\nDebt markers found:\n{}", spec_digest(state), evidence);
        let messages = [
            ChatMessage::system(prompts::TECH_DEBT_PROMPT),
            ChatMessage::user(input),
        ];

        let mut update = StateUpdate::at_step(StepId::TechDebt);
        let report = match self.language.structured(&messages).await {
            Ok(value) => serde_json::from_value::<TechDebtReport>(value)
                .unwrap_or_else(|err| TechDebtReport::degraded(err.to_string())),
            Err(err) => {
                tracing::error!("[{}] Tech-debt analysis failed: {}", state.session_id, err);
                TechDebtReport::degraded(err.to_string())
            }
        };
        update.messages.push(ConversationMessage::assistant(match &report.error {
            Some(error) => format!("Tech-debt analysis failed: {}", error),
            None => format!(
                "Tech-debt analysis complete: {} issue(s) found.",
                report.issues.len()
            ),
        }));
        update.tech_debt_report = Some(report);
        Ok(update)
    }
}

/// Generates the security checklist for the planned feature.
pub struct SecurityStep {
    language: Arc<dyn LanguageCapability>,
}

impl SecurityStep {
    pub fn new(language: Arc<dyn LanguageCapability>) -> Self {
        Self { language }
    }
}

#[async_trait]
impl StepExecutor for SecurityStep {
    fn id(&self) -> StepId {
        StepId::Security
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let messages = [
            ChatMessage::system(prompts::SECURITY_PROMPT),
            ChatMessage::user(spec_digest(state)),
        ];

        let mut update = StateUpdate::at_step(StepId::Security);
        let report = match self.language.structured(&messages).await {
            Ok(value) => serde_json::from_value::<SecurityReport>(value)
                .unwrap_or_else(|err| SecurityReport::degraded(err.to_string())),
            Err(err) => {
                tracing::error!("[{}] Security check failed: {}", state.session_id, err);
                SecurityReport::degraded(err.to_string())
            }
        };
        update.messages.push(ConversationMessage::assistant(match &report.error {
            Some(error) => format!("Security check failed: {}", error),
            None => format!(
                "Security checklist ready: {} check(s), overall status {}.",
                report.checks.len(),
                report.overall_status.as_deref().unwrap_or("unknown")
            ),
        }));
        update.security_report = Some(report);
        Ok(update)
    }
}

#[derive(Debug, Deserialize)]
struct DiagramOutcome {
    #[serde(default)]
    diagram_type: Option<DiagramKind>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Generates a Mermaid diagram of the planned feature.
pub struct DiagramStep {
    language: Arc<dyn LanguageCapability>,
}

impl DiagramStep {
    pub fn new(language: Arc<dyn LanguageCapability>) -> Self {
        Self { language }
    }
}

#[async_trait]
impl StepExecutor for DiagramStep {
    fn id(&self) -> StepId {
        StepId::Diagram
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let messages = [
            ChatMessage::system(prompts::DIAGRAM_PROMPT),
            ChatMessage::user(spec_digest(state)),
        ];

        let mut update = StateUpdate::at_step(StepId::Diagram);
        match self
            .language
            .structured(&messages)
            .await
            .and_then(|value| Ok(serde_json::from_value::<DiagramOutcome>(value)?))
        {
            Ok(outcome) => {
                let diagram = Diagram {
                    kind: outcome.diagram_type.unwrap_or_default(),
                    source: outcome.source,
                    title: outcome.title,
                    description: outcome.description,
                };
                update.messages.push(ConversationMessage::assistant(format!(
                    "Diagram generated{}.",
                    diagram
                        .title
                        .as_deref()
                        .map(|t| format!(": {}", t))
                        .unwrap_or_default()
                )));
                update.diagram = Some(diagram);
            }
            Err(err) => {
                tracing::error!("[{}] Diagram generation failed: {}", state.session_id, err);
                update.last_error = Some(err.to_string());
                update.messages.push(ConversationMessage::assistant(
                    "Diagram generation failed. You can try again with /diagram.",
                ));
            }
        }
        Ok(update)
    }
}

/// Decides whether the feature should split into per-repository specs.
pub struct MultiSpecStep {
    language: Arc<dyn LanguageCapability>,
}

impl MultiSpecStep {
    pub fn new(language: Arc<dyn LanguageCapability>) -> Self {
        Self { language }
    }
}

#[async_trait]
impl StepExecutor for MultiSpecStep {
    fn id(&self) -> StepId {
        StepId::MultiSpec
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let mut input = spec_digest(state);
        let _ = writeln!(
            input,
            "Selected repositories: {}",
            state.selected_repositories.join(", ")
        );
        let messages = [
            ChatMessage::system(prompts::MULTI_SPEC_PROMPT),
            ChatMessage::user(input),
        ];

        let mut update = StateUpdate::at_step(StepId::MultiSpec);
        let mut breakdown = match self.language.structured(&messages).await {
            Ok(value) => serde_json::from_value::<MultiSpecBreakdown>(value)
                .unwrap_or_else(|err| MultiSpecBreakdown::degraded(err.to_string())),
            Err(err) => {
                tracing::error!(
                    "[{}] Multi-spec detection failed: {}",
                    state.session_id,
                    err
                );
                MultiSpecBreakdown::degraded(err.to_string())
            }
        };
        if breakdown.enforce_cap() {
            tracing::info!(
                "[{}] Multi-spec breakdown capped at {} sub-specs",
                state.session_id,
                breakdown.specs.len()
            );
        }
        update.messages.push(ConversationMessage::assistant(match &breakdown.error {
            Some(error) => format!("Multi-spec detection failed: {}", error),
            None if breakdown.should_split => format!(
                "This feature spans {} repositories; I suggest splitting it \
                 into {} spec(s).",
                breakdown.affected_repositories.len(),
                breakdown.specs.len()
            ),
            None => "A single specification covers this feature.".to_string(),
        }));
        update.multi_spec = Some(breakdown);
        Ok(update)
    }
}
