use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// The conversation memory of one agent.
///
/// Messages are only ever appended; the session is never pruned or
/// summarised, so a long conversation grows without bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for the session
    pub id: String,
    /// The messages in the conversation
    pub messages: Vec<Message>,
    /// The current status of the session
    pub status: SessionStatus,
}

/// The status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Idle, waiting for input
    Idle,
    /// Currently running a round
    Running,
    /// The last round reached a final answer
    Completed,
    /// The last round ended degraded
    Error,
}

impl Session {
    /// Creates a new, empty session.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            status: SessionStatus::Idle,
        }
    }

    /// Adds a message to the session.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the number of messages in the session.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Clears all messages from the session.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.status = SessionStatus::Idle;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
