mod agent_loop;
pub mod protocol;

pub use agent_loop::{
    Agent, AgentConfig, AgentEvent, AgentStream, DEFAULT_SYSTEM_PROMPT, FailureReason,
    MAX_ITERATIONS, RoundReport, RoundStatus,
};
pub use protocol::{Decision, ToolCall, ToolProtocol};
