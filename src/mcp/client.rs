//! Typed MCP client facade
//!
//! Wraps a [`Channel`] with the handful of MCP operations this harness
//! consumes: `initialize`, `tools/list`, `tools/call`, and the optional
//! `resources/list`. Also owns the content-normalization boundary, so
//! downstream code never re-sniffs result shapes.

use crate::error::{HermesError, Result};
use crate::mcp::protocol::PROTOCOL_VERSION;
use crate::mcp::Channel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Identity and protocol revision reported by the server during initialize
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub protocol_version: String,
}

/// One entry of the server's tool catalog.
///
/// Read-only for the session's duration; the schema is JSON-Schema-shaped
/// (type, named properties, required-name list) and is handed to the LLM
/// provider untouched apart from provider-specific schema conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (e.g. "search")
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// JSON Schema for input parameters
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Normalized shape of an external tool result.
///
/// External servers return lists under several spellings; this is the one
/// place that recognizes them.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolContent {
    /// A recognized list of items
    Items(Vec<Value>),
    /// Anything else, passed through untouched
    Unrecognized(Value),
}

/// Locate a list of items in a raw tool result.
///
/// Recognizes a top-level array and the `results` / `pages` / `data`
/// wrappers; everything else is tagged [`ToolContent::Unrecognized`].
pub fn normalize_items(raw: &Value) -> ToolContent {
    if let Some(items) = raw.as_array() {
        return ToolContent::Items(items.clone());
    }
    for key in ["results", "pages", "data"] {
        if let Some(items) = raw.get(key).and_then(Value::as_array) {
            return ToolContent::Items(items.clone());
        }
    }
    ToolContent::Unrecognized(raw.clone())
}

/// Extract textual content from a tool result.
///
/// MCP results expose a list of typed content blocks; the first text block
/// wins. A result with no such block is serialized whole.
pub fn extract_text(result: &Value) -> String {
    if let Some(blocks) = result.get("content").and_then(Value::as_array) {
        for block in blocks {
            if block.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    return text.to_string();
                }
            }
        }
    }
    serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
}

/// Typed facade over one correlated request channel
#[derive(Clone)]
pub struct McpClient {
    channel: Arc<dyn Channel>,
}

impl McpClient {
    /// Wrap a channel. `initialize` must be the first call made through it.
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel }
    }

    /// Perform the MCP handshake and return the server's identity
    pub async fn initialize(&self) -> Result<ServerInfo> {
        let result = self
            .channel
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "hermes",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;

        let protocol_version = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut info: ServerInfo = result
            .get("serverInfo")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_else(|| ServerInfo {
                name: String::new(),
                version: String::new(),
                protocol_version: String::new(),
            });
        info.protocol_version = protocol_version;

        info!(
            server = %info.name,
            version = %info.version,
            protocol = %info.protocol_version,
            "initialized"
        );
        Ok(info)
    }

    /// Fetch the server's tool catalog
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let result = self.channel.request("tools/list", json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| {
                HermesError::Transport("tools/list result carried no 'tools' member".to_string())
            })?;
        let tools: Vec<ToolDescriptor> = serde_json::from_value(tools)?;
        debug!(count = tools.len(), "fetched tool catalog");
        Ok(tools)
    }

    /// Invoke one tool with a JSON argument object
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        debug!(tool = name, "calling tool");
        self.channel
            .request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments,
                }),
            )
            .await
    }

    /// List the server's resources, if it implements the method.
    ///
    /// `resources/list` is optional; a method-not-found answer means the
    /// feature is unavailable, not that the call failed.
    pub async fn list_resources(&self) -> Result<Option<Vec<Value>>> {
        match self.channel.request("resources/list", json!({})).await {
            Ok(result) => {
                let resources = result
                    .get("resources")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                Ok(Some(resources))
            }
            Err(e) if e.is_method_not_found() => {
                debug!("server does not implement resources/list");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
