//! The translation invoker.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm::{FinishReason, LLMClient, LLMInput};
use crate::session::Message;

/// Returned when translating without a completion client.
pub const NOT_INITIALIZED: &str = "Error: the language model is not initialized.";

const TEMPLATE: &str = "You are a professional translation engine.
Task: translate the following text accurately into [{target}].

Text to translate:
{text}

Requirements:
1. Output only the final translated content.
2. Do not include any explanatory wording (such as \"Here is the translation\").";

/// Translates text through the completion service.
#[derive(Clone)]
pub struct Translator {
    llm_client: Option<Arc<dyn LLMClient>>,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl Translator {
    pub fn new(llm_client: Arc<dyn LLMClient>, model: impl Into<String>) -> Self {
        Self {
            llm_client: Some(llm_client),
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// A translator with no completion client; every call reports
    /// [`NOT_INITIALIZED`].
    pub fn uninitialized() -> Self {
        Self {
            llm_client: None,
            model: String::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Builds the fixed translation instruction.
    pub fn instruction(text: &str, target_language: &str) -> String {
        TEMPLATE
            .replace("{target}", target_language)
            .replace("{text}", text)
    }

    /// Translates `text` into `target_language`, returning the model output
    /// unmodified, or error text.
    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        self.try_translate(text, target_language)
            .await
            .unwrap_or_else(|message| message)
    }

    /// Like [`Translator::translate`], with failures kept apart.
    pub async fn try_translate(&self, text: &str, target_language: &str) -> Result<String, String> {
        let Some(llm_client) = &self.llm_client else {
            return Err(NOT_INITIALIZED.to_string());
        };

        let input = LLMInput {
            model: self.model.clone(),
            messages: vec![Message::new_user(Self::instruction(text, target_language))],
            system_prompt: String::new(),
            tools: Vec::new(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(target_language, chars = text.chars().count(), "Requesting translation");
        match llm_client.complete(input).await {
            Ok(output) if output.finish_reason == FinishReason::MaxTokens => {
                warn!("Translation stopped at the token limit");
                Err(format!(
                    "Translation incomplete: the output hit the token limit. Partial result:\n{}",
                    output.text()
                ))
            }
            Ok(output) => Ok(output.text()),
            Err(err) => {
                warn!(error = %err, "Translation request failed");
                Err(format!("Translation failed: {}", err))
            }
        }
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("initialized", &self.llm_client.is_some())
            .field("model", &self.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMError, LLMOutput, MockLLMClient};

    #[tokio::test]
    async fn uninitialized_translator_reports_error() {
        let translator = Translator::uninitialized();

        assert_eq!(translator.translate("hello", "French").await, NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn sends_template_and_returns_raw_output() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .withf(|input| {
                let prompt = input.messages[0].text();
                input.tools.is_empty()
                    && input.model == "qwen-plus"
                    && prompt.contains("[Japanese]")
                    && prompt.contains("Good morning")
                    && prompt.contains("Output only the final translated content")
            })
            .times(1)
            .returning(|_| Ok(LLMOutput::text_only("  おはようございます\n")));

        let translator = Translator::new(Arc::new(mock), "qwen-plus");
        let result = translator.translate("Good morning", "Japanese").await;

        assert_eq!(result, "  おはようございます\n");
    }

    #[tokio::test]
    async fn default_request_has_no_token_limit() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .withf(|input| input.max_tokens.is_none())
            .times(1)
            .returning(|_| Ok(LLMOutput::text_only("Bonjour")));

        let translator = Translator::new(Arc::new(mock), "qwen-plus");

        assert_eq!(translator.translate("Hello", "French").await, "Bonjour");
    }

    #[tokio::test]
    async fn truncated_output_is_reported() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete().returning(|_| {
            Ok(LLMOutput {
                finish_reason: FinishReason::MaxTokens,
                ..LLMOutput::text_only("Half of the trans")
            })
        });

        let translator = Translator::new(Arc::new(mock), "qwen-plus");
        let result = translator
            .try_translate(&"word ".repeat(6_000), "French")
            .await;

        let message = result.unwrap_err();
        assert!(message.starts_with("Translation incomplete"));
        assert!(message.ends_with("Half of the trans"));
    }

    #[tokio::test]
    async fn service_failure_becomes_text() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete()
            .returning(|_| Err(LLMError::ApiError("503 Service Unavailable".into())));

        let translator = Translator::new(Arc::new(mock), "qwen-plus");
        let result = translator.translate("text", "German").await;

        assert_eq!(result, "Translation failed: API error: 503 Service Unavailable");
    }
}
