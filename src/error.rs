//! Error types for the file-assistant library.

use thiserror::Error;

/// Unified error type for the crate.
///
/// Tool-level failures never surface as this type during a round; they are
/// rendered as observation text. It exists for callers that drive the
/// components directly.
#[derive(Debug, Error)]
pub enum Error {
    /// Completion service error
    #[error("LLM error: {0}")]
    LLM(#[from] crate::llm::LLMError),

    /// Tool registration or argument error
    #[error("Tool error: {0}")]
    Tool(#[from] crate::tool::ToolError),

    /// Document extraction error
    #[error("Document error: {0}")]
    Document(#[from] crate::document::DocumentError),

    /// Session initialization error
    #[error("Session error: {0}")]
    Session(#[from] crate::assistant::SessionError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
