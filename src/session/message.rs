use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a message in the conversation memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: String,
    /// The role of the message sender
    pub role: MessageRole,
    /// The content of the message
    pub content: Vec<MessageContent>,
    /// Timestamp when the message was created
    pub created_at: DateTime<Utc>,
}

/// The role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,
    /// Assistant message (from the completion service)
    Assistant,
    /// Tool result message
    Tool,
}

/// The content of a message, which can be text or a tool call/result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text content
    Text {
        /// The text content
        text: String,
    },
    /// A tool call request
    ToolCall {
        /// Unique identifier for the tool call
        id: String,
        /// The name of the tool to call
        name: String,
        /// The raw argument payload, exactly as the model produced it
        arguments: String,
    },
    /// The result of a tool execution
    ToolResult {
        /// The ID of the tool call this result is for
        tool_call_id: String,
        /// The result returned by the tool
        result: String,
        /// Whether the tool execution resulted in an error
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl Message {
    fn with_role(role: MessageRole, content: Vec<MessageContent>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    /// Creates a new user message.
    pub fn new_user(text: impl Into<String>) -> Self {
        Self::with_role(
            MessageRole::User,
            vec![MessageContent::Text { text: text.into() }],
        )
    }

    /// Creates a new assistant message.
    pub fn new_assistant(content: Vec<MessageContent>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Creates a new assistant message holding plain text.
    pub fn new_assistant_text(text: impl Into<String>) -> Self {
        Self::new_assistant(vec![MessageContent::Text { text: text.into() }])
    }

    /// Creates a new tool result message.
    pub fn new_tool_result(results: Vec<MessageContent>) -> Self {
        Self::with_role(MessageRole::Tool, results)
    }

    /// Concatenates the text parts of the message, skipping tool content.
    pub fn text(&self) -> String {
        content_text(&self.content)
    }
}

/// Concatenates the `Text` items of a content list.
pub fn content_text(content: &[MessageContent]) -> String {
    content
        .iter()
        .filter_map(|c| match c {
            MessageContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_skips_tool_content() {
        let message = Message::new_assistant(vec![
            MessageContent::Text { text: "Reading ".into() },
            MessageContent::ToolCall {
                id: "call_1".into(),
                name: "read_local_file".into(),
                arguments: "{}".into(),
            },
            MessageContent::Text { text: "now".into() },
        ]);

        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text(), "Reading now");
    }

    #[test]
    fn content_serializes_with_type_tag() {
        let value = serde_json::to_value(MessageContent::ToolResult {
            tool_call_id: "call_1".into(),
            result: "done".into(),
            is_error: None,
        })
        .unwrap();

        assert_eq!(value["type"], "tool_result");
        assert!(value.get("is_error").is_none());
    }
}
