//! OpenRouterCapability - REST implementation of the language capability.
//!
//! Talks to the OpenRouter Chat Completions API. Configuration comes from
//! environment variables (OPENROUTER_API_KEY, OPENROUTER_MODEL_NAME).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use specloom_core::capability::{ChatMessage, LanguageCapability};
use specloom_core::error::{Result, SpecloomError};
use std::env;
use std::time::Duration;

const DEFAULT_MODEL: &str = "google/gemini-2.5-pro";
const BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Language capability backed by the OpenRouter HTTP API.
#[derive(Clone)]
pub struct OpenRouterCapability {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenRouterCapability {
    /// Creates a capability with the provided API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Model name defaults to `google/gemini-2.5-pro` if not specified.
    ///
    /// # Errors
    ///
    /// Returns an error if OPENROUTER_API_KEY is not set.
    pub fn try_from_env() -> Result<Self> {
        let api_key = env::var("OPENROUTER_API_KEY").map_err(|_| {
            SpecloomError::capability("OPENROUTER_API_KEY not found in environment variables")
        })?;
        let capability = Self::new(api_key);
        Ok(match env::var("OPENROUTER_MODEL_NAME") {
            Ok(model) => capability.with_model(model),
            Err(_) => capability,
        })
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    async fn send_request(&self, body: &ChatCompletionRequest<'_>) -> Result<String> {
        tracing::debug!(
            "OpenRouter request: model={}, {} message(s), json_mode={}",
            body.model,
            body.messages.len(),
            body.response_format.is_some()
        );
        let response = self
            .client
            .post(BASE_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                SpecloomError::capability(format!("OpenRouter request failed: {}", err))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenRouter error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            SpecloomError::capability(format!("Failed to parse OpenRouter response: {}", err))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl LanguageCapability for OpenRouterCapability {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            response_format: None,
        };
        self.send_request(&request).await
    }

    async fn structured(&self, messages: &[ChatMessage]) -> Result<serde_json::Value> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let text = self.send_request(&request).await?;
        // Some models wrap JSON mode output in a code fence anyway.
        let trimmed = strip_code_fence(&text);
        serde_json::from_str(trimmed).map_err(|err| {
            SpecloomError::capability(format!(
                "OpenRouter returned invalid JSON in structured mode: {}",
                err
            ))
        })
    }
}

/// Strips a surrounding ``` or ```json fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            SpecloomError::capability("OpenRouter returned no content in the response")
        })
}

fn map_http_error(status: StatusCode, body: String) -> SpecloomError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);
    SpecloomError::capability(format!("OpenRouter API error {}: {}", status, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_text_response_requires_content() {
        let empty = ChatCompletionResponse { choices: vec![] };
        assert!(extract_text_response(empty).is_err());

        let filled = ChatCompletionResponse {
            choices: vec![Choice {
                message: ResponseMessage {
                    content: Some("hello".to_string()),
                },
            }],
        };
        assert_eq!(extract_text_response(filled).unwrap(), "hello");
    }

    #[test]
    fn test_map_http_error_prefers_api_message() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            "{\"error\": {\"message\": \"rate limited\"}}".to_string(),
        );
        assert!(err.to_string().contains("rate limited"));
        assert!(err.is_capability());
    }
}
