//! Gateway client - the single point of entry for all model calls in this service.
//!
//! ARCHITECTURAL RULE: No other module may call the generation gateway directly.
//! All LLM interactions MUST go through this module.
//!
//! The gateway speaks the OpenAI chat-completions dialect. Rate-limit (429) and
//! quota (402) responses are surfaced as distinct error variants so callers can
//! back off or prompt for billing; there is no local retry, the caller decides.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Model used for synthesis, refinement, and interview questions.
/// Intentionally hardcoded to prevent accidental drift.
pub const SYNTHESIS_MODEL: &str = "google/gemini-2.5-flash";
/// Model used for rubric grading and re-grading.
pub const GRADING_MODEL: &str = "google/gemini-2.5-pro";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by gateway")]
    RateLimited,

    #[error("Payment required by gateway")]
    PaymentRequired,

    #[error("Gateway returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage<'a>],
}

/// One role-tagged message in a chat-completions request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// The single gateway client used by all modules in this service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            api_key,
        }
    }

    /// Sends a list of role-tagged messages to the gateway and returns the
    /// first choice's text content.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage<'_>],
    ) -> Result<String, LlmError> {
        let request_body = ChatRequest { model, messages };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let chat: ChatResponse = response.json().await?;

        if let Some(usage) = &chat.usage {
            debug!(
                "Gateway call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    /// Convenience wrapper for the common system + single user message shape.
    pub async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, LlmError> {
        let messages = [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ];
        self.chat(model, &messages).await
    }
}

/// Maps a non-success gateway status to the matching error variant.
fn classify_failure(status: u16, message: String) -> LlmError {
    match status {
        429 => LlmError::RateLimited,
        402 => LlmError::PaymentRequired,
        _ => LlmError::Api { status, message },
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_classify_429_as_rate_limited() {
        assert!(matches!(
            classify_failure(429, String::new()),
            LlmError::RateLimited
        ));
    }

    #[test]
    fn test_classify_402_as_payment_required() {
        assert!(matches!(
            classify_failure(402, String::new()),
            LlmError::PaymentRequired
        ));
    }

    #[test]
    fn test_classify_other_status_as_api_error() {
        match classify_failure(503, "overloaded".to_string()) {
            LlmError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }
}
