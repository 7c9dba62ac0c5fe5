//! Language-generation capability trait.

use crate::error::Result;
use crate::session::message::{ConversationMessage, MessageRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message sent to the language capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl From<&ConversationMessage> for ChatMessage {
    fn from(message: &ConversationMessage) -> Self {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

/// Service producing text or structured JSON from a message list.
///
/// Network timeouts and retries are the implementation's concern; the
/// workflow only distinguishes success from failure.
#[async_trait]
pub trait LanguageCapability: Send + Sync {
    /// Free-form completion: returns the assistant's reply text.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// JSON-mode completion: returns the parsed structured reply.
    async fn structured(&self, messages: &[ChatMessage]) -> Result<serde_json::Value>;
}
