//! Chat sessions: transcript ownership and the bounded tool loop

pub mod transcript;
pub mod turn;

pub use transcript::{ConversationEntry, Role, ToolInvocation, Transcript};
pub use turn::{ChatSession, MAX_TOOL_RESULT_CHARS, MAX_TOOL_ROUNDS};
