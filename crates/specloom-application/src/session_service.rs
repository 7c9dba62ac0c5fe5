//! Session lifecycle service.
//!
//! `SessionService` is the single entry point for driving a specification
//! session: it loads the latest checkpoint, folds the caller's input into
//! state, runs the engine to the next pause, and persists every snapshot
//! the run produced. Invocations on the same session are serialized; an
//! interleaved call observes the committed result of the previous one.

use specloom_core::checkpoint::{Checkpoint, CheckpointRepository, CheckpointSummary};
use specloom_core::error::{Result, SpecloomError};
use specloom_core::session::{
    merge, ConversationMessage, SessionState, SpecSection, StateUpdate, UserCommand, UserProfile,
};
use specloom_core::step::StepId;
use specloom_execution::{CompiledWorkflow, RunOutcome};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One turn of caller input.
#[derive(Debug, Clone, Default)]
pub struct InvokeRequest {
    /// Target session; a fresh id is generated when absent.
    pub session_id: Option<String>,
    /// Free-form user message; empty messages are not recorded.
    pub message: String,
    /// One-shot command for this invocation.
    pub command: Option<UserCommand>,
    /// Replaces the session's repository selection when present.
    pub repositories: Option<Vec<String>>,
    /// Replaces the session's user profile when present.
    pub profile: Option<UserProfile>,
}

/// Outcome of one invocation, shaped for presentation layers.
#[derive(Debug, Clone)]
pub struct InvokeResponse {
    pub session_id: String,
    /// Most recent assistant reply, if the run produced one.
    pub assistant_reply: Option<String>,
    pub completion_percentage: u8,
    pub spec_sections: BTreeMap<SpecSection, String>,
    /// Whether the spec has reached the preview threshold.
    pub is_complete: bool,
    /// Whether the session reached a terminal transition (export, cancel
    /// or the iteration bound). Finished sessions no longer accept turns.
    pub finished: bool,
}

/// Coordinates the workflow engine with checkpoint storage.
pub struct SessionService {
    workflow: Arc<CompiledWorkflow>,
    checkpoints: Arc<dyn CheckpointRepository>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionService {
    pub fn new(workflow: Arc<CompiledWorkflow>, checkpoints: Arc<dyn CheckpointRepository>) -> Self {
        Self {
            workflow,
            checkpoints,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns a session's lock handle to the map, dropping the map entry
    /// when no other task holds it. Keeps the lock map bounded by the
    /// number of in-flight sessions rather than every id ever seen.
    async fn release_lock(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // Cloning in session_lock and pruning here are both serialized by
        // the map mutex, so a waiter's clone is always visible in the count.
        drop(lock);
        if locks
            .get(session_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(session_id);
        }
    }

    #[cfg(test)]
    async fn lock_entries(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Runs one turn: folds the caller's input into the session, drives
    /// the workflow to the next pause or terminal, and persists one
    /// checkpoint per executed step.
    pub async fn invoke(&self, mut request: InvokeRequest) -> Result<InvokeResponse> {
        let session_id = request
            .session_id
            .take()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let lock = self.session_lock(&session_id).await;
        let guard = lock.lock().await;
        let result = self.run_turn(&session_id, request).await;
        drop(guard);
        self.release_lock(&session_id, lock).await;
        result
    }

    async fn run_turn(&self, session_id: &str, request: InvokeRequest) -> Result<InvokeResponse> {
        let (state, resume) = match self.checkpoints.latest(session_id).await? {
            Some(checkpoint) => (checkpoint.state, StepId::WaitInput),
            None => (SessionState::new(session_id), StepId::Analyze),
        };
        tracing::info!(
            "[{}] Invocation (resume: {}, command: {:?})",
            session_id,
            resume,
            request.command
        );

        let mut input = StateUpdate::default();
        if !request.message.trim().is_empty() {
            input
                .messages
                .push(ConversationMessage::user(request.message));
        }
        input.command = request.command;
        input.selected_repositories = request.repositories;
        input.user_profile = request.profile;
        let state = merge(state, input);

        let report = self.workflow.run(state, resume).await?;

        for snapshot in &report.snapshots {
            self.checkpoints
                .append(&Checkpoint::capture(snapshot.step, snapshot.state.clone()))
                .await?;
        }
        tracing::debug!(
            "[{}] Run complete: {:?}, {} checkpoint(s), {}%",
            session_id,
            report.outcome,
            report.snapshots.len(),
            report.state.completion_percentage
        );

        Ok(InvokeResponse {
            session_id: session_id.to_string(),
            assistant_reply: report.state.last_assistant_reply().map(str::to_string),
            completion_percentage: report.state.completion_percentage,
            spec_sections: report.state.spec_sections.clone(),
            is_complete: report.state.is_complete(),
            finished: report.outcome == RunOutcome::Finished,
        })
    }

    /// Latest known state of a session.
    ///
    /// # Errors
    ///
    /// Returns [`SpecloomError::NotFound`] when the session has no history.
    pub async fn get_state(&self, session_id: &str) -> Result<SessionState> {
        self.checkpoints
            .latest(session_id)
            .await?
            .map(|checkpoint| checkpoint.state)
            .ok_or_else(|| SpecloomError::not_found("session", session_id))
    }

    /// Checkpoint history of a session, oldest first.
    pub async fn list_checkpoints(&self, session_id: &str) -> Result<Vec<CheckpointSummary>> {
        Ok(self
            .checkpoints
            .list(session_id)
            .await?
            .iter()
            .map(Checkpoint::summary)
            .collect())
    }

    /// Discards a session's entire history.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let lock = self.session_lock(session_id).await;
        let guard = lock.lock().await;
        let result = self.checkpoints.delete_session(session_id).await;
        drop(guard);
        self.release_lock(session_id, lock).await;
        result
    }
}

/// Renders the specification document as Markdown, one section per
/// heading in template order. Unfilled sections render as placeholders.
pub fn render_spec_markdown(state: &SessionState) -> String {
    let mut document = format!("# Feature Specification\n\n> {}\n", state.feature_summary);
    for section in SpecSection::ALL {
        document.push_str(&format!("\n## {}\n\n", section.title()));
        match state.spec_sections.get(&section) {
            Some(content) if !content.trim().is_empty() => {
                document.push_str(content.trim());
                document.push('\n');
            }
            _ => document.push_str("_To be defined._\n"),
        }
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use specloom_core::capability::{ChatMessage, CodeSnippet, LanguageCapability};
    use specloom_core::capability::CodeSearchCapability;
    use specloom_core::session::MessageRole;
    use specloom_execution::standard_workflow;
    use specloom_infrastructure::InMemoryCheckpointRepository;

    struct ScriptedLanguage;

    #[async_trait]
    impl LanguageCapability for ScriptedLanguage {
        async fn chat(&self, _messages: &[ChatMessage]) -> specloom_core::Result<String> {
            Ok("Tell me more about the edge cases.".to_string())
        }

        async fn structured(
            &self,
            messages: &[ChatMessage],
        ) -> specloom_core::Result<serde_json::Value> {
            if messages[0].content.contains("clarifying questions") {
                Ok(json!({"main_goal": "Add login", "complexity": 2, "questions": []}))
            } else {
                Ok(json!({}))
            }
        }
    }

    /// Same script as [`ScriptedLanguage`] but yields to the scheduler on
    /// every call, so two in-flight turns interleave at each await point.
    struct YieldingLanguage;

    #[async_trait]
    impl LanguageCapability for YieldingLanguage {
        async fn chat(&self, _messages: &[ChatMessage]) -> specloom_core::Result<String> {
            tokio::task::yield_now().await;
            Ok("Tell me more about the edge cases.".to_string())
        }

        async fn structured(
            &self,
            messages: &[ChatMessage],
        ) -> specloom_core::Result<serde_json::Value> {
            tokio::task::yield_now().await;
            if messages[0].content.contains("clarifying questions") {
                Ok(json!({"main_goal": "Add login", "complexity": 2, "questions": []}))
            } else {
                Ok(json!({}))
            }
        }
    }

    struct NoHits;

    #[async_trait]
    impl CodeSearchCapability for NoHits {
        async fn search(
            &self,
            _repository: &str,
            _query: &str,
            _limit: usize,
        ) -> specloom_core::Result<Vec<CodeSnippet>> {
            Ok(Vec::new())
        }
    }

    fn service() -> SessionService {
        let workflow = standard_workflow(Arc::new(ScriptedLanguage), Arc::new(NoHits)).unwrap();
        SessionService::new(Arc::new(workflow), Arc::new(InMemoryCheckpointRepository::new()))
    }

    fn turn(session_id: &str, message: &str) -> InvokeRequest {
        InvokeRequest {
            session_id: Some(session_id.to_string()),
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_two_turns_accumulate_history_in_order() {
        let service = service();

        let first = service.invoke(turn("s-1", "Add login")).await.unwrap();
        assert!(!first.finished);
        assert!(first.assistant_reply.is_some());

        let second = service.invoke(turn("s-1", "Email and password")).await.unwrap();
        assert!(!second.finished);

        let state = service.get_state("s-1").await.unwrap();
        let user_messages: Vec<&str> = state
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(user_messages, vec!["Add login", "Email and password"]);
        assert_eq!(state.iteration_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let service = service();
        let err = service.get_state("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_checkpoints_accumulate_per_step() {
        let service = service();
        service.invoke(turn("s-1", "Add login")).await.unwrap();

        let history = service.list_checkpoints("s-1").await.unwrap();
        // One checkpoint per executed step of the main loop.
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].step, StepId::Analyze);
        assert_eq!(history.last().map(|c| c.step), Some(StepId::CheckCompletion));
    }

    #[tokio::test]
    async fn test_cancel_finishes_session() {
        let service = service();
        service.invoke(turn("s-1", "Add login")).await.unwrap();

        let response = service
            .invoke(InvokeRequest {
                session_id: Some("s-1".to_string()),
                command: Some(UserCommand::Cancel),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(response.finished);
        // The consumed command is persisted as cleared.
        let state = service.get_state("s-1").await.unwrap();
        assert_eq!(state.last_command, None);
    }

    #[tokio::test]
    async fn test_delete_session_forgets_history() {
        let service = service();
        service.invoke(turn("s-1", "Add login")).await.unwrap();

        service.delete_session("s-1").await.unwrap();
        assert!(service.get_state("s-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_turns_on_one_session_serialize() {
        let workflow = standard_workflow(Arc::new(YieldingLanguage), Arc::new(NoHits)).unwrap();
        let service =
            SessionService::new(Arc::new(workflow), Arc::new(InMemoryCheckpointRepository::new()));

        let (first, second) = tokio::join!(
            service.invoke(turn("s-1", "Add login")),
            service.invoke(turn("s-1", "Email and password")),
        );
        first.unwrap();
        second.unwrap();

        // Whichever turn ran second resumed from the other's checkpoint, so
        // both inputs survive and neither turn's writes are lost.
        let state = service.get_state("s-1").await.unwrap();
        let mut user_messages: Vec<&str> = state
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect();
        user_messages.sort_unstable();
        assert_eq!(user_messages, vec!["Add login", "Email and password"]);
        assert_eq!(state.iteration_count, 2);

        // A fresh turn snapshots 5 steps, a resumed one 6.
        let history = service.list_checkpoints("s-1").await.unwrap();
        assert_eq!(history.len(), 11);
    }

    #[tokio::test]
    async fn test_lock_map_does_not_retain_idle_sessions() {
        let service = service();

        service.invoke(turn("s-1", "Add login")).await.unwrap();
        assert_eq!(service.lock_entries().await, 0);

        service.invoke(turn("s-2", "Add export")).await.unwrap();
        service.delete_session("s-1").await.unwrap();
        service.delete_session("s-2").await.unwrap();
        assert_eq!(service.lock_entries().await, 0);
    }

    #[test]
    fn test_render_spec_markdown_covers_all_sections() {
        let mut state = SessionState::new("s-1");
        state.feature_summary = "Add login".to_string();
        state.spec_sections.insert(
            SpecSection::Description,
            "Users sign in with corporate SSO.".to_string(),
        );

        let document = render_spec_markdown(&state);
        assert!(document.contains("## Description / Context"));
        assert!(document.contains("corporate SSO"));
        assert!(document.contains("## Risks or Limitations"));
        assert!(document.contains("_To be defined._"));
    }
}
