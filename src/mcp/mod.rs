//! MCP client: protocol types, transports, and the typed client facade
//!
//! The channel layer pairs outgoing JSON-RPC requests with asynchronous
//! responses by id, over either a newline-delimited stdio pipe to a child
//! process or HTTP POST with header-based session correlation.

pub mod client;
pub mod http;
pub mod protocol;
pub mod stdio;

pub use client::{McpClient, ServerInfo, ToolContent, ToolDescriptor};
pub use http::HttpChannel;
pub use stdio::StdioChannel;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Fixed window each outstanding request gets before it fails with
/// [`crate::error::HermesError::Timeout`]. There is no automatic retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A correlated request channel to one external MCP server.
///
/// Implementations own the underlying connection or process for their
/// lifetime. Request ids are issued in strictly increasing order per
/// channel instance and replies are matched by id, not arrival order, so
/// out-of-order delivery is tolerated. One channel serves one logical
/// session; its session identifier must not be shared across sessions.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Send one request and suspend until the matching reply, a timeout,
    /// or transport closure.
    async fn request(&self, method: &str, params: Value) -> Result<Value>;
}
