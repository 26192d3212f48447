//! The boundary between a chat shell and the agent.

use std::sync::Arc;
use tracing::info;

use crate::agent::Agent;
use crate::config::AssistantConfig;
use crate::llm::LLMError;
use crate::llm::client::LLMClientBuilder;
use crate::session::Session;
use crate::tool::{ToolError, builtin};
use crate::translate::Translator;
use crate::writer::FileWriter;

/// Failures that prevent a session from being created.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no API key provided")]
    MissingCredential,
    #[error("invalid API key: {0}")]
    InvalidCredential(String),
    #[error("could not resolve the desktop directory; set a save root")]
    NoSaveDirectory,
    #[error("failed to build the completion client: {0}")]
    Client(LLMError),
    #[error("failed to register tools: {0}")]
    Tools(#[from] ToolError),
}

/// Creates an agent with a fresh conversation from `config`.
///
/// This is the only place errors reach the shell as values: without a
/// usable credential there is nothing to retry.
pub fn initialize(config: &AssistantConfig) -> Result<Agent, SessionError> {
    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(SessionError::MissingCredential)?;

    let mut builder = LLMClientBuilder::new()
        .with_api_key(api_key)
        .with_base_url(config.base_url.clone());
    if let Some(timeout) = config.timeout {
        builder = builder.with_timeout(timeout);
    }
    let llm_client = builder.build_openai().map_err(|err| match err {
        LLMError::AuthError(reason) => SessionError::InvalidCredential(reason),
        other => SessionError::Client(other),
    })?;

    let writer = match &config.save_root {
        Some(root) => FileWriter::new(root),
        None => FileWriter::desktop().ok_or(SessionError::NoSaveDirectory)?,
    };
    let translator = Translator::new(llm_client.clone(), config.model.clone())
        .with_max_tokens(config.max_tokens)
        .with_temperature(config.temperature);
    let registry = builtin::registry(translator, writer)?;

    let session = Session::new();
    info!(session = %session.id, model = %config.model, protocol = ?config.protocol, "Agent initialized");
    Ok(Agent::new(
        session,
        llm_client,
        Arc::new(registry),
        config.agent_config(),
    ))
}

/// Runs one instruction and returns the text to show the user, whatever
/// happened.
pub async fn run(agent: &Agent, instruction: &str) -> String {
    agent.run(instruction).await.answer
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_or_blank_credential_is_rejected() {
        let none = AssistantConfig::default();
        assert!(matches!(initialize(&none), Err(SessionError::MissingCredential)));

        let blank = AssistantConfig::default().with_api_key("   ");
        assert!(matches!(initialize(&blank), Err(SessionError::MissingCredential)));
    }

    #[test]
    fn unusable_credential_is_invalid() {
        let config = AssistantConfig::default().with_api_key("sk-\u{7f}bad");
        assert!(matches!(
            initialize(&config),
            Err(SessionError::InvalidCredential(_))
        ));
    }

    #[tokio::test]
    async fn initialized_agent_starts_empty() {
        let root = TempDir::new().unwrap();
        let config = AssistantConfig::default()
            .with_api_key("sk-test")
            .with_save_root(root.path());

        let agent = initialize(&config).unwrap();

        assert!(agent.messages().await.is_empty());
        assert_eq!(agent.config().max_iterations, 8);
    }
}
