//! How a decision is framed for the completion service and read back.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use crate::llm::LLMOutput;
use crate::session::{Message, MessageContent};
use crate::tool::{Observation, ToolDefinition};

/// Action name that ends a round in the structured protocol.
pub const FINAL_ANSWER_ACTION: &str = "Final Answer";

static JSON_BLOB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?i:json)?\s*(.*?)```").expect("valid regex")
});

/// A call proposed by the decision step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Identifier used to pair the call with its result
    pub id: String,
    pub name: String,
    /// Raw argument payload; may not parse
    pub arguments: String,
}

/// What the decision step asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Stop with this answer.
    Final(String),
    /// Run a tool.
    Call {
        call: ToolCall,
        /// The assistant text that carried the call
        raw: String,
    },
    /// The completion could not be understood.
    Invalid { raw: String, reason: String },
}

/// The way tools are offered to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToolProtocol {
    /// Tools are sent through the function-calling API.
    #[default]
    Native,
    /// Tools are described in the system prompt and the model answers with
    /// a fenced JSON blob naming an action.
    Structured,
}

impl ToolProtocol {
    /// Returns the system prompt and API tool list for a decision request.
    pub fn frame(&self, prefix: &str, tools: Vec<ToolDefinition>) -> (String, Vec<ToolDefinition>) {
        match self {
            ToolProtocol::Native => (prefix.to_string(), tools),
            ToolProtocol::Structured => (structured_prompt(prefix, &tools), Vec::new()),
        }
    }

    /// Reads a completion as a decision. Only the first tool call is taken.
    pub fn interpret(&self, output: &LLMOutput, step: usize) -> Decision {
        let text = output.text();
        match self {
            ToolProtocol::Native => {
                let call = output.content.iter().find_map(|c| match c {
                    MessageContent::ToolCall {
                        id,
                        name,
                        arguments,
                    } => Some(ToolCall {
                        id: if id.is_empty() {
                            format!("call_{}", step)
                        } else {
                            id.clone()
                        },
                        name: name.clone(),
                        arguments: arguments.clone(),
                    }),
                    _ => None,
                });
                match call {
                    Some(call) => Decision::Call { call, raw: text },
                    None if text.trim().is_empty() => Decision::Invalid {
                        raw: text,
                        reason: "the response contained neither a tool call nor an answer"
                            .to_string(),
                    },
                    None => Decision::Final(text),
                }
            }
            ToolProtocol::Structured => parse_structured(&text, step),
        }
    }

    /// Memory entry recording the proposed call.
    pub fn call_message(&self, call: &ToolCall, raw: &str) -> Message {
        match self {
            ToolProtocol::Native => Message::new_assistant(vec![MessageContent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            }]),
            ToolProtocol::Structured => Message::new_assistant_text(raw),
        }
    }

    /// Memory entry feeding an observation back.
    pub fn observation_message(&self, call_id: &str, observation: &Observation) -> Message {
        match self {
            ToolProtocol::Native => Message::new_tool_result(vec![MessageContent::ToolResult {
                tool_call_id: call_id.to_string(),
                result: observation.result.clone(),
                is_error: observation.is_error.then_some(true),
            }]),
            ToolProtocol::Structured => {
                Message::new_user(format!("Observation: {}", observation.result))
            }
        }
    }
}

/// Observation recorded when a completion cannot be understood.
pub fn invalid_observation(reason: &str) -> Observation {
    Observation {
        tool: "_invalid_response".to_string(),
        result: format!(
            "Invalid or incomplete response: {}. Reply with a tool call or a final answer.",
            reason
        ),
        is_error: true,
    }
}

#[derive(Debug, Deserialize)]
struct ActionBlob {
    action: String,
    #[serde(default)]
    action_input: Value,
}

/// Parses a structured-chat reply.
///
/// Text without any JSON blob is taken as the final answer; a blob that does
/// not parse or lacks `action` is invalid.
pub fn parse_structured(text: &str, step: usize) -> Decision {
    let candidate = match JSON_BLOB.captures(text) {
        Some(captures) => captures.get(1).map_or("", |m| m.as_str()).trim(),
        None => {
            let trimmed = text.trim();
            if !trimmed.starts_with('{') {
                return if trimmed.is_empty() {
                    Decision::Invalid {
                        raw: text.to_string(),
                        reason: "the response was empty".to_string(),
                    }
                } else {
                    Decision::Final(trimmed.to_string())
                };
            }
            trimmed
        }
    };

    let blob: ActionBlob = match serde_json::from_str(candidate) {
        Ok(blob) => blob,
        Err(err) => {
            return Decision::Invalid {
                raw: text.to_string(),
                reason: format!("could not parse the action blob ({})", err),
            };
        }
    };

    if blob.action == FINAL_ANSWER_ACTION {
        let answer = match blob.action_input {
            Value::String(answer) => answer,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        return Decision::Final(answer);
    }

    let arguments = match blob.action_input {
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Decision::Call {
        call: ToolCall {
            id: format!("call_{}", step),
            name: blob.action,
            arguments,
        },
        raw: text.to_string(),
    }
}

fn structured_prompt(prefix: &str, tools: &[ToolDefinition]) -> String {
    let mut prompt = String::new();
    if !prefix.is_empty() {
        prompt.push_str(prefix);
        prompt.push_str("\n\n");
    }
    prompt.push_str("You have access to the following tools:\n\n");
    for tool in tools {
        let args = tool
            .input_schema
            .get("properties")
            .cloned()
            .unwrap_or(Value::Object(Default::default()));
        prompt.push_str(&format!("{}: {}, args: {}\n", tool.name, tool.description, args));
    }

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    prompt.push_str(&format!(
        r#"
Use a JSON blob to specify a tool by providing an "action" key (tool name) and an "action_input" key (tool input).

Valid "action" values: "{final_answer}" or {names}

Provide only ONE action per JSON blob, formatted as:

```json
{{
  "action": $TOOL_NAME,
  "action_input": $INPUT
}}
```

After each action you will receive an "Observation:" message with the result. When you know the answer, respond with:

```json
{{
  "action": "{final_answer}",
  "action_input": "Final response to the user"
}}
```

Always respond with a single valid JSON blob."#,
        final_answer = FINAL_ANSWER_ACTION,
        names = names.join(", ")
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FinishReason, Usage};
    use serde_json::json;

    fn tool_output(name: &str, arguments: &str) -> LLMOutput {
        LLMOutput {
            content: vec![
                MessageContent::ToolCall {
                    id: String::new(),
                    name: name.into(),
                    arguments: arguments.into(),
                },
                MessageContent::ToolCall {
                    id: "ignored".into(),
                    name: "other".into(),
                    arguments: "{}".into(),
                },
            ],
            finish_reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        }
    }

    #[test]
    fn native_takes_first_tool_call() {
        let decision = ToolProtocol::Native.interpret(&tool_output("read_local_file", "{}"), 3);

        match decision {
            Decision::Call { call, .. } => {
                assert_eq!(call.id, "call_3");
                assert_eq!(call.name, "read_local_file");
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn native_text_is_final_and_empty_is_invalid() {
        let protocol = ToolProtocol::Native;

        assert_eq!(
            protocol.interpret(&LLMOutput::text_only("Done."), 1),
            Decision::Final("Done.".into())
        );
        assert!(matches!(
            protocol.interpret(&LLMOutput::text_only("  "), 1),
            Decision::Invalid { .. }
        ));
    }

    #[test]
    fn structured_parses_fenced_action() {
        let text = "Thought: read it first\n```json\n{\"action\": \"read_local_file\", \"action_input\": {\"file_path\": \"a.txt\"}}\n```";

        let decision = parse_structured(text, 2);

        match decision {
            Decision::Call { call, raw } => {
                assert_eq!(call.name, "read_local_file");
                assert_eq!(
                    serde_json::from_str::<Value>(&call.arguments).unwrap(),
                    json!({"file_path": "a.txt"})
                );
                assert_eq!(raw, text);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn structured_final_answer() {
        let text = "```\n{\"action\": \"Final Answer\", \"action_input\": \"Saved.\"}\n```";
        assert_eq!(parse_structured(text, 1), Decision::Final("Saved.".into()));

        let bare = r#"{"action": "Final Answer", "action_input": "ok"}"#;
        assert_eq!(parse_structured(bare, 1), Decision::Final("ok".into()));
    }

    #[test]
    fn structured_plain_text_is_final() {
        assert_eq!(
            parse_structured("Hello! Which file?", 1),
            Decision::Final("Hello! Which file?".into())
        );
    }

    #[test]
    fn structured_broken_blob_is_invalid() {
        let decision = parse_structured("```json\n{\"action\": \n```", 1);
        assert!(matches!(decision, Decision::Invalid { .. }));

        let missing_action = parse_structured("```json\n{\"tool\": \"x\"}\n```", 1);
        assert!(matches!(missing_action, Decision::Invalid { .. }));
    }

    #[test]
    fn structured_frame_lists_tools_in_prompt() {
        let tools = crate::tool::builtin::test_registry().definitions();

        let (prompt, api_tools) = ToolProtocol::Structured.frame("You are a file assistant.", tools);

        assert!(api_tools.is_empty());
        assert!(prompt.starts_with("You are a file assistant."));
        assert!(prompt.contains("save_to_folder: "));
        assert!(prompt.contains("\"folder_name\""));
        assert!(prompt.contains("\"Final Answer\" or read_local_file"));
    }

    #[test]
    fn observation_messages_follow_protocol() {
        let observation = Observation {
            tool: "echo".into(),
            result: "hi".into(),
            is_error: false,
        };

        let native = ToolProtocol::Native.observation_message("call_1", &observation);
        assert_eq!(
            native.content,
            vec![MessageContent::ToolResult {
                tool_call_id: "call_1".into(),
                result: "hi".into(),
                is_error: None,
            }]
        );

        let structured = ToolProtocol::Structured.observation_message("call_1", &observation);
        assert_eq!(structured.text(), "Observation: hi");
    }
}
