//! Bounded tool-invocation loop
//!
//! Mediates between the text-generation provider and the MCP server: send
//! the transcript plus tool catalog, execute any requested invocations
//! against the server, append the results, and go again — until the model
//! produces a final text answer or the iteration ceiling is reached.

use crate::error::{HermesError, Result};
use crate::llm::ChatProvider;
use crate::mcp::client::extract_text;
use crate::mcp::{McpClient, ToolDescriptor};
use crate::session::transcript::{ToolInvocation, Transcript};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Iteration ceiling for one user query. Reaching it is fatal for the
/// query, not the session.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// Upper bound on one tool result's length in the transcript
pub const MAX_TOOL_RESULT_CHARS: usize = 4000;

/// Loop state for one user query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    AwaitingModelReply,
    ExecutingTools,
    Done,
    Exhausted,
}

/// One conversation session: provider, MCP client, and the transcript it
/// exclusively owns.
pub struct ChatSession {
    provider: Box<dyn ChatProvider>,
    client: McpClient,
    tools: Vec<ToolDescriptor>,
    transcript: Transcript,
}

impl ChatSession {
    /// Fetch the server's tool catalog and open a session.
    ///
    /// The catalog is read once here and treated as read-only for the
    /// session's duration.
    pub async fn start(
        provider: Box<dyn ChatProvider>,
        client: McpClient,
        system_prompt: Option<&str>,
    ) -> Result<Self> {
        let tools = client.list_tools().await?;
        info!(
            provider = provider.name(),
            tools = tools.len(),
            "session ready"
        );
        Ok(Self {
            provider,
            client,
            tools,
            transcript: Transcript::new(system_prompt),
        })
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Run one bounded tool-calling turn and return the final answer.
    ///
    /// Each iteration makes exactly one provider call and zero or more
    /// tool calls. The transcript survives an exhausted turn, so the
    /// session stays usable for the next query.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        self.transcript.push_user(question);

        let mut state = TurnState::AwaitingModelReply;
        let mut rounds = 0usize;
        let mut pending: Vec<ToolInvocation> = Vec::new();
        let mut answer = String::new();

        loop {
            match state {
                TurnState::AwaitingModelReply => {
                    if rounds == MAX_TOOL_ROUNDS {
                        state = TurnState::Exhausted;
                        continue;
                    }
                    let reply = self
                        .provider
                        .complete(&self.transcript, &self.tools)
                        .await?;
                    self.transcript
                        .push_assistant(reply.text.clone(), reply.tool_calls.clone());

                    if reply.tool_calls.is_empty() {
                        answer = reply.text;
                        state = TurnState::Done;
                    } else {
                        debug!(
                            count = reply.tool_calls.len(),
                            round = rounds + 1,
                            "model requested tool invocations"
                        );
                        pending = reply.tool_calls;
                        state = TurnState::ExecutingTools;
                    }
                }
                TurnState::ExecutingTools => {
                    // Every invocation of this turn runs, in the order the
                    // model requested, before the next model call.
                    for invocation in std::mem::take(&mut pending) {
                        self.execute_invocation(&invocation).await;
                    }
                    rounds += 1;
                    state = TurnState::AwaitingModelReply;
                }
                TurnState::Done => return Ok(answer),
                TurnState::Exhausted => {
                    return Err(HermesError::IterationBudget {
                        rounds: MAX_TOOL_ROUNDS,
                    })
                }
            }
        }
    }

    /// Execute one invocation and append its result or error marker.
    ///
    /// A failure never aborts the turn: the error text lands in the
    /// transcript under the invocation's id so the model can react, and
    /// the remaining invocations of the turn still run.
    async fn execute_invocation(&mut self, invocation: &ToolInvocation) {
        let arguments: Value = match serde_json::from_str(&invocation.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(
                    tool = %invocation.name,
                    "malformed tool arguments, substituting an empty object: {}",
                    e
                );
                json!({})
            }
        };

        match self.client.call_tool(&invocation.name, arguments).await {
            Ok(result) => {
                let text = truncate(extract_text(&result), MAX_TOOL_RESULT_CHARS);
                self.transcript.push_tool_result(invocation, text);
            }
            Err(e) => {
                warn!(tool = %invocation.name, "tool call failed: {}", e);
                self.transcript.push_tool_result(
                    invocation,
                    format!("Tool '{}' failed: {}", invocation.name, e),
                );
            }
        }
    }
}

/// Bound a tool result's length before it enters the transcript
fn truncate(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut bounded: String = text.chars().take(max_chars).collect();
    bounded.push_str(" [truncated]");
    bounded
}
