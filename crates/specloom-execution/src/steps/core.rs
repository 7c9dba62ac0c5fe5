//! The main authoring loop: analyze, retrieve, respond, update, check.

use crate::executor::StepExecutor;
use crate::prompts;
use async_trait::async_trait;
use serde::Deserialize;
use specloom_core::capability::{ChatMessage, CodeSearchCapability, LanguageCapability};
use specloom_core::error::Result;
use specloom_core::session::{
    ConversationMessage, SessionState, SpecSection, StateUpdate, TOTAL_SECTIONS,
};
use specloom_core::step::StepId;
use std::fmt::Write as _;
use std::sync::Arc;

/// Maximum snippets carried in session state after a retrieval pass.
const MAX_CONTEXT_SNIPPETS: usize = 15;
/// Snippets per search query.
const SNIPPETS_PER_QUERY: usize = 5;
/// Snippets injected into the response prompt.
const PROMPT_SNIPPETS: usize = 5;
/// Conversation tail supplied to the analysis and section-extraction
/// prompts.
const RECENT_TURNS: usize = 5;

#[derive(Debug, Deserialize)]
struct AnalysisOutcome {
    #[serde(default)]
    main_goal: String,
    #[serde(default)]
    complexity: Option<f64>,
    #[serde(default)]
    questions: Vec<String>,
}

/// Extracts the feature goal, a complexity score and opening questions
/// from the first user message.
pub struct AnalyzeStep {
    language: Arc<dyn LanguageCapability>,
}

impl AnalyzeStep {
    pub fn new(language: Arc<dyn LanguageCapability>) -> Self {
        Self { language }
    }
}

#[async_trait]
impl StepExecutor for AnalyzeStep {
    fn id(&self) -> StepId {
        StepId::Analyze
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let request = state.last_user_message().unwrap_or_default().to_string();
        let mut input = String::new();
        if !state.selected_repositories.is_empty() {
            let _ = writeln!(
                input,
                "Repositories in scope: {}",
                state.selected_repositories.join(", ")
            );
        }
        for message in state.recent_messages(RECENT_TURNS) {
            let _ = writeln!(input, "{:?}: {}", message.role, message.content);
        }
        let messages = [
            ChatMessage::system(prompts::ANALYZE_PROMPT),
            ChatMessage::user(input),
        ];

        // Malformed output degrades the same way a failed call does; this
        // step always produces a summary and an assistant message.
        let outcome = self
            .language
            .structured(&messages)
            .await
            .and_then(|value| Ok(serde_json::from_value::<AnalysisOutcome>(value)?));

        let mut update = StateUpdate::at_step(StepId::Analyze);
        match outcome {
            Ok(outcome) => {
                let summary = if outcome.main_goal.trim().is_empty() {
                    request
                } else {
                    outcome.main_goal
                };
                let complexity = outcome
                    .complexity
                    .map(|c| (c.round() as i64).clamp(1, 5) as u8);
                tracing::info!(
                    "[{}] Analyzed feature: '{}' (complexity: {:?})",
                    state.session_id,
                    summary,
                    complexity
                );

                let mut reply = format!("Understood - we're working on: {}.", summary);
                if !outcome.questions.is_empty() {
                    reply.push_str("\n\nTo sharpen the spec:");
                    for question in outcome.questions.iter().take(3) {
                        let _ = write!(reply, "\n- {}", question);
                    }
                }
                update.feature_summary = Some(summary);
                update.feature_complexity = complexity;
                update.messages.push(ConversationMessage::assistant(reply));
            }
            Err(err) => {
                // Degrade to the raw request so downstream steps still have
                // a summary to work with.
                tracing::warn!("[{}] Analysis failed: {}", state.session_id, err);
                if !request.is_empty() {
                    update.feature_summary = Some(request);
                }
                update.messages.push(ConversationMessage::assistant(
                    "Got it. Let's work through the specification together - \
                     tell me more about what you have in mind.",
                ));
            }
        }
        Ok(update)
    }
}

/// Searches the selected repositories for code relevant to the feature.
pub struct RetrieveContextStep {
    search: Arc<dyn CodeSearchCapability>,
}

impl RetrieveContextStep {
    pub fn new(search: Arc<dyn CodeSearchCapability>) -> Self {
        Self { search }
    }

    fn queries(summary: &str) -> Vec<String> {
        vec![
            summary.to_string(),
            format!("{} implementation", summary),
            format!("{} test", summary),
        ]
    }
}

#[async_trait]
impl StepExecutor for RetrieveContextStep {
    fn id(&self) -> StepId {
        StepId::RetrieveContext
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let mut update = StateUpdate::at_step(StepId::RetrieveContext);
        if state.selected_repositories.is_empty() || state.feature_summary.trim().is_empty() {
            return Ok(update);
        }

        let mut snippets = Vec::new();
        'outer: for repository in &state.selected_repositories {
            for query in Self::queries(&state.feature_summary) {
                match self
                    .search
                    .search(repository, &query, SNIPPETS_PER_QUERY)
                    .await
                {
                    Ok(hits) => snippets.extend(hits),
                    // A failed query degrades retrieval, not the session.
                    Err(err) => {
                        tracing::warn!(
                            "[{}] Search '{}' in {} failed: {}",
                            state.session_id,
                            query,
                            repository,
                            err
                        );
                    }
                }
                if snippets.len() >= MAX_CONTEXT_SNIPPETS {
                    break 'outer;
                }
            }
        }
        snippets.truncate(MAX_CONTEXT_SNIPPETS);
        tracing::debug!(
            "[{}] Retrieved {} snippets from {} repositories",
            state.session_id,
            snippets.len(),
            state.selected_repositories.len()
        );
        update.code_context = Some(snippets);
        Ok(update)
    }
}

/// Produces the next assistant turn from the conversation and retrieved
/// context.
pub struct GenerateResponseStep {
    language: Arc<dyn LanguageCapability>,
}

impl GenerateResponseStep {
    pub fn new(language: Arc<dyn LanguageCapability>) -> Self {
        Self { language }
    }
}

#[async_trait]
impl StepExecutor for GenerateResponseStep {
    fn id(&self) -> StepId {
        StepId::GenerateResponse
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let mut messages = vec![ChatMessage::system(prompts::system_prompt(
            state.user_profile,
        ))];
        if !state.code_context.is_empty() {
            let mut context = String::from("Relevant code from the selected repositories:\n");
            for snippet in state.code_context.iter().take(PROMPT_SNIPPETS) {
                let _ = match snippet.line {
                    Some(line) => {
                        writeln!(context, "{}:{}\n{}", snippet.file, line, snippet.content)
                    }
                    None => writeln!(context, "{}\n{}", snippet.file, snippet.content),
                };
            }
            messages.push(ChatMessage::system(context));
        }
        messages.extend(state.messages.iter().map(ChatMessage::from));

        let mut update = StateUpdate::at_step(StepId::GenerateResponse);
        match self.language.chat(&messages).await {
            Ok(reply) => {
                update.messages.push(ConversationMessage::assistant(reply));
                update.iteration_delta = 1;
            }
            Err(err) => {
                // The apology keeps the conversation coherent; skipping the
                // iteration increment keeps the failed turn free.
                tracing::error!("[{}] Response generation failed: {}", state.session_id, err);
                update.messages.push(ConversationMessage::assistant(
                    "Sorry, I couldn't produce a response just now. Please try \
                     again in a moment.",
                ));
            }
        }
        Ok(update)
    }
}

/// Extracts section content from the latest exchange.
pub struct UpdateSpecStep {
    language: Arc<dyn LanguageCapability>,
}

impl UpdateSpecStep {
    pub fn new(language: Arc<dyn LanguageCapability>) -> Self {
        Self { language }
    }
}

#[async_trait]
impl StepExecutor for UpdateSpecStep {
    fn id(&self) -> StepId {
        StepId::UpdateSpec
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let mut input = String::from("Current sections:\n");
        for (section, content) in &state.spec_sections {
            let _ = writeln!(input, "[{}]\n{}\n", section.key(), content);
        }
        input.push_str("\nLatest conversation:\n");
        for message in state.recent_messages(RECENT_TURNS) {
            let _ = writeln!(input, "{:?}: {}", message.role, message.content);
        }

        let messages = [
            ChatMessage::system(prompts::SECTION_UPDATE_PROMPT),
            ChatMessage::user(input),
        ];
        let value = self.language.structured(&messages).await?;

        let mut update = StateUpdate::at_step(StepId::UpdateSpec);
        if let Some(object) = value.as_object() {
            for (key, content) in object {
                let Some(section) = SpecSection::from_key(key) else {
                    tracing::debug!("[{}] Ignoring unknown section '{}'", state.session_id, key);
                    continue;
                };
                if let Some(text) = content.as_str() {
                    update.section_proposals.insert(section, text.to_string());
                }
            }
        }
        tracing::debug!(
            "[{}] Section proposals: {}",
            state.session_id,
            update.section_proposals.len()
        );
        Ok(update)
    }
}

/// Recomputes the completion percentage from filled sections.
pub struct CheckCompletionStep;

#[async_trait]
impl StepExecutor for CheckCompletionStep {
    fn id(&self) -> StepId {
        StepId::CheckCompletion
    }

    async fn execute(&self, state: &SessionState) -> Result<StateUpdate> {
        let filled = state.filled_sections();
        let completion = (filled * 100 / TOTAL_SECTIONS) as u8;
        tracing::info!(
            "[{}] Completion: {}% ({}/{} sections)",
            state.session_id,
            completion,
            filled,
            TOTAL_SECTIONS
        );
        let mut update = StateUpdate::at_step(StepId::CheckCompletion);
        update.completion_percentage = Some(completion);
        Ok(update)
    }
}

/// Pause marker. The engine interrupts before this step and re-enters at
/// its router, so the body only exists to satisfy the graph contract.
pub struct WaitInputStep;

#[async_trait]
impl StepExecutor for WaitInputStep {
    fn id(&self) -> StepId {
        StepId::WaitInput
    }

    async fn execute(&self, _state: &SessionState) -> Result<StateUpdate> {
        Ok(StateUpdate::at_step(StepId::WaitInput))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use specloom_core::capability::CodeSnippet;
    use specloom_core::error::SpecloomError;
    use specloom_core::session::MessageRole;

    struct StaticLanguage {
        structured: specloom_core::Result<serde_json::Value>,
        chat: specloom_core::Result<String>,
    }

    impl StaticLanguage {
        fn structured(value: serde_json::Value) -> Self {
            Self {
                structured: Ok(value),
                chat: Ok(String::new()),
            }
        }

        fn failing() -> Self {
            Self {
                structured: Err(SpecloomError::capability("down")),
                chat: Err(SpecloomError::capability("down")),
            }
        }
    }

    #[async_trait]
    impl LanguageCapability for StaticLanguage {
        async fn chat(&self, _messages: &[ChatMessage]) -> specloom_core::Result<String> {
            self.chat.clone()
        }

        async fn structured(
            &self,
            _messages: &[ChatMessage],
        ) -> specloom_core::Result<serde_json::Value> {
            self.structured.clone()
        }
    }

    fn state_with_user(message: &str) -> SessionState {
        let mut state = SessionState::new("s-1");
        state.messages.push(ConversationMessage::user(message));
        state
    }

    #[tokio::test]
    async fn test_analyze_clamps_complexity_and_asks_questions() {
        let step = AnalyzeStep::new(Arc::new(StaticLanguage::structured(json!({
            "main_goal": "Add SSO login",
            "complexity": 9,
            "questions": ["Which provider?"]
        }))));
        let update = step.execute(&state_with_user("add sso")).await.unwrap();

        assert_eq!(update.feature_summary.as_deref(), Some("Add SSO login"));
        assert_eq!(update.feature_complexity, Some(5));
        assert_eq!(update.messages.len(), 1);
        assert!(update.messages[0].content.contains("Which provider?"));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_to_request_on_failure() {
        let step = AnalyzeStep::new(Arc::new(StaticLanguage::failing()));
        let update = step.execute(&state_with_user("add sso")).await.unwrap();

        assert_eq!(update.feature_summary.as_deref(), Some("add sso"));
        assert_eq!(update.feature_complexity, None);
        assert_eq!(update.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_malformed_output() {
        // Valid JSON, wrong shape: must degrade like a failed call, not
        // escape as an error.
        let step = AnalyzeStep::new(Arc::new(StaticLanguage::structured(json!([1, 2, 3]))));
        let update = step.execute(&state_with_user("add sso")).await.unwrap();

        assert_eq!(update.feature_summary.as_deref(), Some("add sso"));
        assert_eq!(update.feature_complexity, None);
        assert_eq!(update.messages.len(), 1);
    }

    struct CountingSearch;

    #[async_trait]
    impl CodeSearchCapability for CountingSearch {
        async fn search(
            &self,
            repository: &str,
            query: &str,
            limit: usize,
        ) -> specloom_core::Result<Vec<CodeSnippet>> {
            Ok((0..limit)
                .map(|i| CodeSnippet {
                    file: format!("{}/src/{}_{}.rs", repository, query.len(), i),
                    line: Some(i + 1),
                    content: "fn login() {}".to_string(),
                    score: None,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_retrieve_caps_total_snippets() {
        let step = RetrieveContextStep::new(Arc::new(CountingSearch));
        let mut state = state_with_user("add sso");
        state.feature_summary = "sso login".to_string();
        state.selected_repositories = vec!["backend".to_string(), "frontend".to_string()];

        let update = step.execute(&state).await.unwrap();
        let snippets = update.code_context.unwrap();
        assert_eq!(snippets.len(), MAX_CONTEXT_SNIPPETS);
    }

    #[tokio::test]
    async fn test_retrieve_skips_without_repositories() {
        let step = RetrieveContextStep::new(Arc::new(CountingSearch));
        let mut state = state_with_user("add sso");
        state.feature_summary = "sso login".to_string();

        let update = step.execute(&state).await.unwrap();
        assert!(update.code_context.is_none());
    }

    #[tokio::test]
    async fn test_generate_response_failure_skips_iteration() {
        let step = GenerateResponseStep::new(Arc::new(StaticLanguage::failing()));
        let update = step.execute(&state_with_user("hello")).await.unwrap();

        assert_eq!(update.iteration_delta, 0);
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_update_spec_skips_unknown_keys() {
        let step = UpdateSpecStep::new(Arc::new(StaticLanguage::structured(json!({
            "description": "A login feature using corporate SSO.",
            "made_up_section": "ignored",
            "risks": "Provider downtime blocks all logins."
        }))));
        let update = step.execute(&state_with_user("add sso")).await.unwrap();

        assert_eq!(update.section_proposals.len(), 2);
        assert!(update.section_proposals.contains_key(&SpecSection::Risks));
    }

    #[tokio::test]
    async fn test_check_completion_truncates() {
        let mut state = state_with_user("x");
        for section in SpecSection::ALL.iter().take(3) {
            state
                .spec_sections
                .insert(*section, "long enough content for filling".to_string());
        }
        let update = CheckCompletionStep.execute(&state).await.unwrap();
        assert_eq!(update.completion_percentage, Some(30));

        state.spec_sections.insert(
            SpecSection::References,
            "also long enough content here".to_string(),
        );
        let update = CheckCompletionStep.execute(&state).await.unwrap();
        assert_eq!(update.completion_percentage, Some(40));
    }
}
