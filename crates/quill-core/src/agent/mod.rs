//! Agent domain types: identifiers and conversation messages.

mod id;
mod message;

pub use id::{AgentId, MAIN_AGENT};
pub use message::{ConversationMessage, MessageRole};
