pub mod client;
pub mod openai;

pub use client::{FinishReason, LLMClient, LLMError, LLMInput, LLMOutput, Usage};
pub use openai::OpenAIClient;

#[cfg(test)]
pub use client::MockLLMClient;
