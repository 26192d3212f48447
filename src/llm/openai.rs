use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::client::DEFAULT_BASE_URL;
use super::{FinishReason, LLMClient, LLMError, LLMInput, LLMOutput, Usage};
use crate::session::{MessageContent, MessageRole, content_text};

/// OpenAI API response for chat completions.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: UsageInfo,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    #[serde(default)]
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// A client for OpenAI-compatible chat completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    base_url: String,
}

impl OpenAIClient {
    /// Creates a new client. Fails if the key cannot be carried in a header.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LLMError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| LLMError::AuthError("API key contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut client_builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            client_builder = client_builder.timeout(timeout);
        }

        Ok(Self {
            client: client_builder.build()?,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    /// Creates a request builder for chat completions.
    fn chat_completions_request(&self, input: &LLMInput) -> RequestBuilder {
        let body = Self::build_request(input);
        debug!(model = %input.model, tools = input.tools.len(), "Sending chat completion request");

        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body)
    }

    fn build_request(input: &LLMInput) -> ChatRequest {
        let tools: Vec<Value> = input
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect();

        ChatRequest {
            model: input.model.clone(),
            messages: Self::build_messages(input),
            tools: if tools.is_empty() { None } else { Some(tools) },
            max_tokens: input.max_tokens,
            temperature: input.temperature,
            stream: false,
        }
    }

    /// Builds messages for the API request.
    fn build_messages(input: &LLMInput) -> Vec<Value> {
        let mut messages = Vec::new();

        if !input.system_prompt.is_empty() {
            messages.push(json!({
                "role": "system",
                "content": input.system_prompt
            }));
        }

        for msg in &input.messages {
            match msg.role {
                MessageRole::User => {
                    messages.push(json!({
                        "role": "user",
                        "content": content_text(&msg.content)
                    }));
                }
                MessageRole::Assistant => {
                    let tool_calls = msg
                        .content
                        .iter()
                        .filter_map(|c| match c {
                            MessageContent::ToolCall {
                                id,
                                name,
                                arguments,
                            } => Some(json!({
                                "id": id,
                                "type": "function",
                                "function": {
                                    "name": name,
                                    "arguments": arguments
                                }
                            })),
                            _ => None,
                        })
                        .collect::<Vec<_>>();

                    if tool_calls.is_empty() {
                        messages.push(json!({
                            "role": "assistant",
                            "content": content_text(&msg.content)
                        }));
                    } else {
                        messages.push(json!({
                            "role": "assistant",
                            "content": null,
                            "tool_calls": tool_calls
                        }));
                    }
                }
                MessageRole::Tool => {
                    for content in &msg.content {
                        if let MessageContent::ToolResult {
                            tool_call_id,
                            result,
                            ..
                        } = content
                        {
                            messages.push(json!({
                                "role": "tool",
                                "tool_call_id": tool_call_id,
                                "content": result
                            }));
                        }
                    }
                }
            }
        }

        messages
    }

    /// Maps a raw chat completion body to an [`LLMOutput`].
    ///
    /// Tool call arguments are kept as the raw string the model produced; the
    /// agent loop decides what to do with unparsable payloads.
    fn parse_completion(body: &str) -> Result<LLMOutput, LLMError> {
        let response: ChatCompletionResponse = serde_json::from_str(body)
            .map_err(|e| LLMError::InvalidResponse(format!("{}: {}", e, body)))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            LLMError::InvalidResponse(format!("No choices in response. Response: {}", body))
        })?;

        let mut content = Vec::new();
        for tool_call in choice.message.tool_calls.unwrap_or_default() {
            content.push(MessageContent::ToolCall {
                id: tool_call.id,
                name: tool_call.function.name,
                arguments: tool_call.function.arguments,
            });
        }
        if let Some(text) = choice.message.content {
            if !text.is_empty() {
                content.push(MessageContent::Text { text });
            }
        }

        Ok(LLMOutput {
            content,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            usage: Usage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
        })
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn complete(&self, input: LLMInput) -> Result<LLMOutput, LLMError> {
        let response = self.chat_completions_request(&input).send().await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LLMError::AuthError(body));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(LLMError::RateLimitError(body)),
            s => return Err(LLMError::ApiError(format!("{}: {}", s, body))),
        }

        debug!(bytes = body.len(), "Chat completion received");
        Self::parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;
    use crate::tool::ToolDefinition;

    fn input_with(messages: Vec<Message>, tools: Vec<ToolDefinition>) -> LLMInput {
        LLMInput {
            model: "qwen-plus".to_string(),
            messages,
            system_prompt: "You are a file assistant.".to_string(),
            tools,
            max_tokens: Some(512),
            temperature: Some(0.1),
        }
    }

    #[test]
    fn messages_replay_tool_calls_and_results() {
        let messages = vec![
            Message::new_user("read notes.txt"),
            Message::new_assistant(vec![MessageContent::ToolCall {
                id: "call_1".into(),
                name: "read_local_file".into(),
                arguments: r#"{"file_path":"notes.txt"}"#.into(),
            }]),
            Message::new_tool_result(vec![MessageContent::ToolResult {
                tool_call_id: "call_1".into(),
                result: "hello".into(),
                is_error: None,
            }]),
        ];

        let built = OpenAIClient::build_messages(&input_with(messages, Vec::new()));

        assert_eq!(built.len(), 4);
        assert_eq!(built[0]["role"], "system");
        assert_eq!(built[1]["content"], "read notes.txt");
        assert_eq!(built[2]["content"], Value::Null);
        assert_eq!(
            built[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"file_path":"notes.txt"}"#
        );
        assert_eq!(built[3]["role"], "tool");
        assert_eq!(built[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn request_advertises_tools_as_functions() {
        let tools = vec![ToolDefinition {
            name: "save_to_folder".into(),
            description: "Save text".into(),
            input_schema: json!({"type": "object"}),
        }];

        let request = OpenAIClient::build_request(&input_with(Vec::new(), tools));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "save_to_folder");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn request_without_tools_omits_field() {
        let request = OpenAIClient::build_request(&input_with(Vec::new(), Vec::new()));
        let body = serde_json::to_value(&request).unwrap();

        assert!(body.get("tools").is_none());
    }

    #[test]
    fn unset_token_limit_is_not_sent() {
        let input = LLMInput {
            max_tokens: None,
            ..input_with(Vec::new(), Vec::new())
        };

        let body = serde_json::to_value(OpenAIClient::build_request(&input)).unwrap();

        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parse_keeps_raw_tool_arguments() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "read_local_file", "arguments": "{not json"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;

        let output = OpenAIClient::parse_completion(body).unwrap();

        assert_eq!(output.finish_reason, FinishReason::ToolCalls);
        assert_eq!(output.usage.input_tokens, 12);
        assert_eq!(
            output.content,
            vec![MessageContent::ToolCall {
                id: "call_9".into(),
                name: "read_local_file".into(),
                arguments: "{not json".into(),
            }]
        );
    }

    #[test]
    fn parse_text_answer() {
        let body = r#"{"choices":[{"message":{"content":"All done."},"finish_reason":"stop"}]}"#;

        let output = OpenAIClient::parse_completion(body).unwrap();

        assert_eq!(output.text(), "All done.");
        assert_eq!(output.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn parse_rejects_empty_choices() {
        let err = OpenAIClient::parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse(_)));
    }
}
