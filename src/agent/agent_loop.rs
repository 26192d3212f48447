use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::protocol::{Decision, ToolProtocol, invalid_observation};
use crate::llm::{LLMClient, LLMInput};
use crate::session::{Message, Session, SessionStatus};
use crate::tool::{Observation, ToolExecutor, ToolRegistry};

/// Maximum number of decisions in one round.
pub const MAX_ITERATIONS: usize = 8;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an all-purpose file assistant. You can read the \
content of local files, translate it, and save the result into a specified new folder.";

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The model to use
    pub model: String,
    /// The system prompt
    pub system_prompt: String,
    /// Maximum number of decisions before a round is stopped
    pub max_iterations: usize,
    /// Maximum tokens to generate per completion
    pub max_tokens: Option<u32>,
    /// Optional temperature
    pub temperature: Option<f32>,
    /// How tools are offered to the model
    pub protocol: ToolProtocol,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "qwen-plus".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: MAX_ITERATIONS,
            max_tokens: None,
            temperature: Some(0.1),
            protocol: ToolProtocol::default(),
        }
    }
}

/// Events from the agent during a round.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The completion service is being asked for the next step
    DecisionRequested { step: usize },
    /// A tool is about to run
    ToolCall { name: String, arguments: String },
    /// A tool (or a rejected call) produced an observation
    Observation(Observation),
    /// The round is over; always the last event
    Finished(RoundReport),
}

/// Why a round ended without a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ServiceCallFailed,
    IterationCapExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Done,
    Failed(FailureReason),
}

/// The outcome of one instruction round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// Final answer, or the best text available for a failed round
    pub answer: String,
    pub status: RoundStatus,
    /// Observations in the order they were produced
    pub observations: Vec<Observation>,
    /// Number of decisions requested
    pub iterations: usize,
}

impl RoundReport {
    pub fn is_done(&self) -> bool {
        self.status == RoundStatus::Done
    }
}

/// A stream of agent events.
pub type AgentStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// The agent: a completion client, a tool registry and the conversation
/// memory they operate on.
///
/// Rounds on one agent are serialised: a round holds the session lock from
/// the moment the instruction is recorded until its report is produced.
#[derive(Clone)]
pub struct Agent {
    session: Arc<Mutex<Session>>,
    llm_client: Arc<dyn LLMClient>,
    tool_executor: Arc<ToolExecutor>,
    config: AgentConfig,
}

impl Agent {
    /// Creates a new agent.
    pub fn new(
        session: Session,
        llm_client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            llm_client,
            tool_executor: Arc::new(ToolExecutor::new(registry)),
            config,
        }
    }

    /// Creates a new agent with default configuration.
    pub fn with_defaults(
        session: Session,
        llm_client: Arc<dyn LLMClient>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        Self::new(session, llm_client, registry, AgentConfig::default())
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Runs one round for `instruction` and returns its report.
    pub async fn run(&self, instruction: &str) -> RoundReport {
        let mut stream = self.stream(instruction);
        let mut report = None;
        while let Some(event) = stream.next().await {
            if let AgentEvent::Finished(finished) = event {
                report = Some(finished);
            }
        }

        report.unwrap_or_else(|| RoundReport {
            answer: "Execution error: the round ended without a result".to_string(),
            status: RoundStatus::Failed(FailureReason::ServiceCallFailed),
            observations: Vec::new(),
            iterations: 0,
        })
    }

    /// Runs one round for `instruction`, yielding events as it goes.
    pub fn stream(&self, instruction: impl Into<String>) -> AgentStream {
        let instruction = instruction.into();
        let session = self.session.clone();
        let llm_client = self.llm_client.clone();
        let tool_executor = self.tool_executor.clone();
        let config = self.config.clone();

        let stream = async_stream::stream! {
            let mut session = session.lock_owned().await;
            session.add_message(Message::new_user(instruction));
            session.status = SessionStatus::Running;

            let protocol = config.protocol;
            let (system_prompt, tools) =
                protocol.frame(&config.system_prompt, tool_executor.definitions());
            let mut observations: Vec<Observation> = Vec::new();
            let mut step = 0;

            let report = loop {
                if step >= config.max_iterations {
                    let answer = cap_message(config.max_iterations, observations.last());
                    warn!(iterations = step, "Round stopped at the iteration cap");
                    session.add_message(Message::new_assistant_text(answer.clone()));
                    break RoundReport {
                        answer,
                        status: RoundStatus::Failed(FailureReason::IterationCapExceeded),
                        observations,
                        iterations: step,
                    };
                }
                step += 1;

                yield AgentEvent::DecisionRequested { step };
                let input = LLMInput {
                    model: config.model.clone(),
                    messages: session.messages.clone(),
                    system_prompt: system_prompt.clone(),
                    tools: tools.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                };
                debug!(step, messages = input.messages.len(), "Requesting decision");

                let output = match llm_client.complete(input).await {
                    Ok(output) => output,
                    Err(err) => {
                        warn!(step, error = %err, "Decision request failed");
                        break RoundReport {
                            answer: format!("Execution error: {}", err),
                            status: RoundStatus::Failed(FailureReason::ServiceCallFailed),
                            observations,
                            iterations: step,
                        };
                    }
                };

                match protocol.interpret(&output, step) {
                    Decision::Final(answer) => {
                        session.add_message(Message::new_assistant_text(answer.clone()));
                        break RoundReport {
                            answer,
                            status: RoundStatus::Done,
                            observations,
                            iterations: step,
                        };
                    }
                    Decision::Call { call, raw } => {
                        debug!(step, tool = %call.name, "Decision: tool call");
                        yield AgentEvent::ToolCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        };
                        let observation = tool_executor.execute(&call.name, &call.arguments).await;
                        session.add_message(protocol.call_message(&call, &raw));
                        session.add_message(protocol.observation_message(&call.id, &observation));
                        yield AgentEvent::Observation(observation.clone());
                        observations.push(observation);
                    }
                    Decision::Invalid { raw, reason } => {
                        debug!(step, %reason, "Decision: unreadable completion");
                        let observation = invalid_observation(&reason);
                        if !raw.trim().is_empty() {
                            session.add_message(Message::new_assistant_text(raw));
                        }
                        session.add_message(Message::new_user(format!(
                            "Observation: {}",
                            observation.result
                        )));
                        yield AgentEvent::Observation(observation.clone());
                        observations.push(observation);
                    }
                }
            };

            session.status = if report.is_done() {
                SessionStatus::Completed
            } else {
                SessionStatus::Error
            };
            drop(session);

            info!(
                iterations = report.iterations,
                tools = report.observations.len(),
                done = report.is_done(),
                "Round finished"
            );
            yield AgentEvent::Finished(report);
        };

        Box::pin(stream)
    }

    /// Gets the session ID.
    pub async fn session_id(&self) -> String {
        let session = self.session.lock().await;
        session.id.clone()
    }

    /// Gets the current messages.
    pub async fn messages(&self) -> Vec<Message> {
        let session = self.session.lock().await;
        session.messages.clone()
    }

    /// Forgets the conversation so far.
    pub async fn clear_history(&self) {
        let mut session = self.session.lock().await;
        session.clear_messages();
    }
}

fn cap_message(max_iterations: usize, last: Option<&Observation>) -> String {
    let mut answer = format!(
        "Agent stopped after {} iterations without reaching a final answer.",
        max_iterations
    );
    if let Some(observation) = last {
        answer.push_str("\nLast observation: ");
        answer.push_str(&observation.result);
    }
    answer
}
