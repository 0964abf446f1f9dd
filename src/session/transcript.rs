//! Conversation transcript types
//!
//! The transcript is exclusively owned by one chat session: it grows
//! monotonically for the session's lifetime and is discarded with it.
//! Tool-result entries carry a back-reference to the invocation they
//! answer so providers can re-associate them on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of one transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// A tool result answering one assistant-requested invocation
    Tool,
}

/// A tool invocation requested by the model.
///
/// `arguments` is the serialized JSON payload exactly as the model
/// produced it; parsing (and recovery from malformed payloads) happens at
/// execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned invocation id, echoed back on the result entry
    pub id: String,

    /// Tool name from the catalog
    pub name: String,

    /// Serialized JSON argument payload
    pub arguments: String,
}

/// One turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,

    /// Free text; may be empty on assistant entries that only request tools
    pub content: String,

    /// Tool invocations requested by an assistant entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// Back-reference to the invocation a tool entry answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Name of the tool that produced a tool entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            created_at: Utc::now(),
        }
    }
}

/// Append-only conversation transcript
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<ConversationEntry>,
}

impl Transcript {
    /// Create a transcript, optionally seeded with a system entry
    pub fn new(system: Option<&str>) -> Self {
        let mut transcript = Self::default();
        if let Some(text) = system {
            transcript
                .entries
                .push(ConversationEntry::new(Role::System, text.to_string()));
        }
        transcript
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries
            .push(ConversationEntry::new(Role::User, text.into()));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>, tool_calls: Vec<ToolInvocation>) {
        let mut entry = ConversationEntry::new(Role::Assistant, text.into());
        entry.tool_calls = tool_calls;
        self.entries.push(entry);
    }

    /// Append the result (or error marker) for one invocation
    pub fn push_tool_result(&mut self, invocation: &ToolInvocation, text: impl Into<String>) {
        let mut entry = ConversationEntry::new(Role::Tool, text.into());
        entry.tool_call_id = Some(invocation.id.clone());
        entry.tool_name = Some(invocation.name.clone());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
