//! # File Assistant
//!
//! A chat-driven file assistant. A user gives natural-language instructions
//! ("read this file, translate it, save the result") and an agent loop picks
//! among three tools, chaining calls until it can give a final answer:
//!
//! - **`read_local_file`**: text from plain-text, PDF and Word documents
//! - **`universal_translator`**: translation through the completion service
//! - **`save_to_folder`**: writes text into a folder on the desktop
//!
//! ## Quick Start
//!
//! ```no_run
//! use file_assistant::{AssistantConfig, assistant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssistantConfig::from_env();
//!     let agent = assistant::initialize(&config)?;
//!
//!     let answer = assistant::run(
//!         &agent,
//!         "Read ~/Desktop/test.txt, translate it into English and save it \
//!          as en_test.txt in a folder called TranslationResult",
//!     )
//!     .await;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod assistant;
pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod session;
pub mod tool;
pub mod translate;
pub mod writer;

pub use agent::{Agent, AgentConfig, AgentEvent, RoundReport, RoundStatus, ToolProtocol};
pub use assistant::SessionError;
pub use config::AssistantConfig;
pub use error::{Error, Result};
pub use llm::client::LLMClientBuilder;
pub use llm::{LLMClient, LLMError, LLMInput, LLMOutput, OpenAIClient};
pub use session::{Message, MessageContent, MessageRole, Session};
pub use tool::{DynTool, Observation, Tool, ToolDefinition, ToolError, ToolRegistry, ToolResult};
pub use translate::Translator;
pub use writer::FileWriter;
