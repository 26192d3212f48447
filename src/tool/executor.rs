use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::{ToolDefinition, ToolError, ToolRegistry, schema};

/// The text outcome of one tool call, fed back to the decision step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The tool the call named (possibly unknown)
    pub tool: String,
    /// Result or error text
    pub result: String,
    pub is_error: bool,
}

impl Observation {
    fn failure(tool: &str, error: ToolError) -> Self {
        let result = match &error {
            ToolError::InvalidArguments(_) => {
                format!("Error: {} for tool `{}`", error, tool)
            }
            _ => format!("Error: {}", error),
        };
        Self {
            tool: tool.to_string(),
            result,
            is_error: true,
        }
    }
}

/// Executes tool calls proposed by the decision step.
///
/// Every failure mode (unknown tool, malformed payload, schema mismatch,
/// failing tool body) comes back as an [`Observation`] rather than an error.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    /// Creates a new tool executor with the given registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Returns all tool definitions for framing the decision request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Parses, validates and executes a single tool call.
    pub async fn execute(&self, name: &str, raw_arguments: &str) -> Observation {
        let tool = match self.registry.lookup(name) {
            Ok(tool) => tool.clone(),
            Err(err) => {
                let mut observation = Observation::failure(name, err);
                observation.result = format!(
                    "{}. Available tools: {}",
                    observation.result,
                    self.registry.names().join(", ")
                );
                return observation;
            }
        };

        let args = match parse_payload(raw_arguments) {
            Ok(args) => coerce_single_field(&tool.parameters_schema(), args),
            Err(err) => return Observation::failure(name, err),
        };

        if let Err(err) = self.registry.validate(name, &args) {
            debug!(tool = name, error = %err, "Rejected tool arguments");
            return Observation::failure(name, err);
        }

        info!(tool = name, "Executing tool");
        let result = tool.execute(args).await;
        let is_error = result.is_error();
        debug!(tool = name, is_error, "Tool finished");

        Observation {
            tool: name.to_string(),
            result: result.into_text(),
            is_error,
        }
    }
}

fn parse_payload(raw: &str) -> Result<Value, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| {
        ToolError::InvalidArguments(format!("argument payload is not valid JSON ({})", e))
    })
}

/// A bare value given to a tool with exactly one required field is taken as
/// that field.
fn coerce_single_field(schema: &Value, args: Value) -> Value {
    if args.is_object() {
        return args;
    }
    let fields = schema::fields(schema);
    let mut required = fields.iter().filter(|f| f.required);
    match (required.next(), required.next()) {
        (Some(field), None) => {
            let mut obj = Map::new();
            obj.insert(field.name.clone(), args);
            Value::Object(obj)
        }
        _ => args,
    }
}
