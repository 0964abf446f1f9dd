//! Hermes - MCP client harness with a bounded LLM tool-calling loop
//!
//! Hermes launches or connects to an external MCP (Model Context Protocol)
//! server, issues JSON-RPC requests to it over stdio or HTTP transports,
//! and glues the server's tool catalog to a text-generation provider's
//! function-calling loop.
//!
//! # Architecture
//!
//! The system is organized into a few layers:
//! - **Mcp**: JSON-RPC envelopes, the correlated request channel (stdio
//!   and HTTP transports), and the typed client facade
//! - **Llm**: text-generation providers (OpenAI-compatible and Gemini)
//! - **Session**: the conversation transcript and the bounded
//!   tool-invocation loop
//! - **Config**: environment-driven settings, validated before any
//!   network activity
//!
//! # Example
//!
//! ```ignore
//! use hermes_core::{ChatSession, HttpChannel, McpClient, Settings};
//! use hermes_core::llm::provider_from_settings;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hermes_core::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let channel = Arc::new(HttpChannel::new("http://localhost:3000/mcp", None));
//!     let client = McpClient::new(channel);
//!     client.initialize().await?;
//!
//!     let provider = provider_from_settings(&settings)?;
//!     let mut session = ChatSession::start(provider, client, None).await?;
//!     let answer = session.ask("what pages mention the roadmap?").await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod session;

// Re-export commonly used types
pub use config::{Endpoint, ProviderKind, Settings};
pub use error::{HermesError, Result};
pub use llm::{provider_from_settings, ChatProvider, ChatReply};
pub use mcp::{
    Channel, HttpChannel, McpClient, ServerInfo, StdioChannel, ToolContent, ToolDescriptor,
};
pub use session::{ChatSession, ConversationEntry, Role, ToolInvocation, Transcript};
