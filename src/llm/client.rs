use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::openai::OpenAIClient;
use crate::session::{Message, MessageContent, content_text};
use crate::tool::ToolDefinition;

/// Environment variable consulted when no API key is given to the builder.
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// OpenAI-compatible endpoint of DashScope.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Input for a completion request.
#[derive(Debug, Clone)]
pub struct LLMInput {
    /// The model to use
    pub model: String,
    /// The messages to send
    pub messages: Vec<Message>,
    /// The system prompt
    pub system_prompt: String,
    /// Tools advertised through the native function-calling API
    pub tools: Vec<ToolDefinition>,
    /// Maximum tokens to generate; left to the service when unset
    pub max_tokens: Option<u32>,
    /// Optional temperature (0.0 to 1.0)
    pub temperature: Option<f32>,
}

/// Output from a completion.
#[derive(Debug, Clone)]
pub struct LLMOutput {
    /// The content of the response
    pub content: Vec<MessageContent>,
    /// The reason the response finished
    pub finish_reason: FinishReason,
    /// Token usage statistics
    pub usage: Usage,
}

impl LLMOutput {
    /// Creates a text-only output, mostly useful for test doubles.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            content: vec![MessageContent::Text { text: text.into() }],
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    /// Concatenated text content of the completion.
    pub fn text(&self) -> String {
        content_text(&self.content)
    }
}

/// The reason the model finished generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop point reached
    Stop,
    /// Stopped due to tool calls
    ToolCalls,
    /// Maximum tokens reached
    MaxTokens,
    /// Stopped due to an error
    Error,
}

impl FinishReason {
    pub(crate) fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("length") => FinishReason::MaxTokens,
            _ => FinishReason::Error,
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Number of input tokens
    pub input_tokens: u32,
    /// Number of output tokens
    pub output_tokens: u32,
}

/// Errors that can occur when talking to the completion service.
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// An API error occurred
    #[error("API error: {0}")]
    ApiError(String),
    /// A network error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    /// The response from the service was invalid
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),
    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),
}

/// An opaque text-completion service.
///
/// Both the decision step of the agent loop and the translation tool go
/// through this trait, so one handle is shared by everything in a session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends a request and returns a complete response.
    async fn complete(&self, input: LLMInput) -> Result<LLMOutput, LLMError>;
}

/// A builder for creating completion clients.
#[derive(Debug, Default)]
pub struct LLMClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl LLMClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout. Without one, a stalled request blocks the
    /// round indefinitely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Creates an OpenAI-compatible client.
    pub fn build_openai(self) -> Result<Arc<dyn LLMClient>, LLMError> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| LLMError::AuthError("API key not provided".to_string()))?;
        let client = OpenAIClient::new(api_key, self.base_url, self.timeout)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_maps_api_strings() {
        assert_eq!(FinishReason::from_api(Some("stop")), FinishReason::Stop);
        assert_eq!(
            FinishReason::from_api(Some("tool_calls")),
            FinishReason::ToolCalls
        );
        assert_eq!(
            FinishReason::from_api(Some("length")),
            FinishReason::MaxTokens
        );
        assert_eq!(FinishReason::from_api(None), FinishReason::Error);
    }

    #[test]
    fn builder_rejects_key_with_control_characters() {
        let result = LLMClientBuilder::new()
            .with_api_key("sk-abc\ndef")
            .build_openai();

        assert!(matches!(result, Err(LLMError::AuthError(_))));
    }
}
