//! Assistant configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::agent::{AgentConfig, DEFAULT_SYSTEM_PROMPT, MAX_ITERATIONS, ToolProtocol};
use crate::llm::client::{API_KEY_ENV, DEFAULT_BASE_URL};

pub const BASE_URL_ENV: &str = "DASHSCOPE_BASE_URL";
pub const MODEL_ENV: &str = "FILE_ASSISTANT_MODEL";
pub const DEFAULT_MODEL: &str = "qwen-plus";

/// Everything needed to initialise an agent.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Credential for the completion service
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    /// Per-completion token limit; none by default
    pub max_tokens: Option<u32>,
    pub protocol: ToolProtocol,
    pub system_prompt: String,
    /// Base directory for saved folders; the desktop when unset
    pub save_root: Option<PathBuf>,
    /// Request timeout for the completion service; none by default
    pub timeout: Option<Duration>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.1),
            max_tokens: None,
            protocol: ToolProtocol::Native,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            save_root: None,
            timeout: None,
        }
    }
}

impl AssistantConfig {
    /// Defaults seeded from `DASHSCOPE_API_KEY`, `DASHSCOPE_BASE_URL` and
    /// `FILE_ASSISTANT_MODEL`.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Defaults seeded from `var`; empty values count as unset.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        config.api_key = var(API_KEY_ENV);
        if let Some(base_url) = var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Some(model) = var(MODEL_ENV) {
            config.model = model;
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_save_root(mut self, save_root: impl Into<PathBuf>) -> Self {
        self.save_root = Some(save_root.into());
        self
    }

    /// The agent half of the configuration.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            max_iterations: MAX_ITERATIONS,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            protocol: self.protocol,
        }
    }
}
