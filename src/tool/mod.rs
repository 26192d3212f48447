pub mod builtin;
pub mod executor;
pub mod registry;
pub mod schema;

pub use executor::{Observation, ToolExecutor};
pub use registry::ToolRegistry;
pub use schema::SchemaField;
pub use tool_trait::{DynTool, Tool};
pub use tool_types::{ToolDefinition, ToolError, ToolResult};

mod tool_types {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    use super::schema::{self, SchemaField};

    /// Definition of a tool as advertised to the decision step.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ToolDefinition {
        /// The name of the tool
        pub name: String,
        /// A description of what the tool does
        pub description: String,
        /// JSON Schema for the tool's input parameters
        pub input_schema: Value,
    }

    impl ToolDefinition {
        /// The declared input fields, in schema order.
        pub fn fields(&self) -> Vec<SchemaField> {
            schema::fields(&self.input_schema)
        }
    }

    /// The outcome of executing a tool: success text or error text.
    ///
    /// Tools never fail through control flow; whatever happened is rendered
    /// as text so the decision step can read it and react.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ToolResult {
        /// The output from the tool
        pub output: String,
        /// Error message if the tool execution failed
        pub error: Option<String>,
    }

    impl ToolResult {
        /// Creates a successful result.
        pub fn ok(output: impl Into<String>) -> Self {
            Self {
                output: output.into(),
                error: None,
            }
        }

        /// Creates a result with an error.
        pub fn error(error: impl Into<String>) -> Self {
            Self {
                output: String::new(),
                error: Some(error.into()),
            }
        }

        pub fn is_error(&self) -> bool {
            self.error.is_some()
        }

        /// The text fed back to the model.
        pub fn into_text(self) -> String {
            self.error.unwrap_or(self.output)
        }
    }

    /// Errors raised around tool execution, before a tool body ever runs.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum ToolError {
        #[error("invalid arguments: {0}")]
        InvalidArguments(String),
        #[error("unknown tool `{0}`")]
        UnknownTool(String),
        #[error("a tool named `{0}` is already registered")]
        DuplicateName(String),
    }
}

mod tool_trait {
    use super::tool_types::{ToolDefinition, ToolResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    /// A named capability the agent can call.
    #[async_trait]
    pub trait Tool: Send + Sync {
        /// Returns the name of the tool.
        fn name(&self) -> &str;
        /// Returns a description of what the tool does.
        fn description(&self) -> &str;
        /// Returns the JSON Schema for the tool's input parameters.
        fn parameters_schema(&self) -> Value;

        /// Executes the tool with arguments already validated against
        /// [`Tool::parameters_schema`].
        async fn execute(&self, args: Value) -> ToolResult;

        /// Converts the tool to its definition.
        fn to_definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                input_schema: self.parameters_schema(),
            }
        }
    }

    /// A type alias for a dynamic tool reference.
    pub type DynTool = Arc<dyn Tool>;
}
