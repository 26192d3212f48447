mod message;
mod session;

pub use message::{Message, MessageContent, MessageRole, content_text};
pub use session::{Session, SessionStatus};
