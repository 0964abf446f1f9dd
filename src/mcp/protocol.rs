//! JSON-RPC 2.0 protocol types for the MCP client
//!
//! Defines the request/response envelopes exchanged with an external MCP
//! server. The wire contract is fixed by the server: requests carry a
//! numeric id allocated by the channel, responses echo it back and carry
//! either a `result` or an `error`.

use crate::error::{HermesError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string, constant on every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision sent during `initialize`
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Well-known JSON-RPC error code: requested method does not exist.
///
/// Optional MCP methods (e.g. `resources/list`) signal "unimplemented"
/// with this code, so callers treat it as a soft condition.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,

    /// Method name to invoke
    pub method: String,

    /// Parameters object
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,

    /// Request id, allocated by the sending channel
    pub id: u64,
}

impl JsonRpcRequest {
    /// Build a request envelope with a caller-supplied id
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// JSON-RPC 2.0 response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,

    /// Result (present if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error (present if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// Request id echoed from the request; null for server notifications
    #[serde(default)]
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    /// The echoed request id, when it is numeric.
    ///
    /// Servers are expected to echo the numeric id we sent; anything else
    /// cannot be correlated and is treated as unmatched.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }

    /// Unwrap this response into its result value.
    ///
    /// A response carrying an `error` member surfaces as
    /// [`HermesError::Remote`]; a response with neither member is a framing
    /// violation and surfaces as a transport error.
    pub fn into_result(self, method: &str) -> Result<Value> {
        if let Some(err) = self.error {
            return Err(HermesError::Remote {
                code: err.code,
                message: err.message,
            });
        }
        self.result.ok_or_else(|| {
            HermesError::Transport(format!("response to '{method}' carried neither result nor error"))
        })
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,

    /// Error message
    pub message: String,

    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(7, "tools/list", json!({}));

        let encoded = serde_json::to_string(&request).unwrap();
        assert!(encoded.contains("\"jsonrpc\":\"2.0\""));
        assert!(encoded.contains("\"method\":\"tools/list\""));
        assert!(encoded.contains("\"id\":7"));
    }

    #[test]
    fn test_null_params_omitted() {
        let request = JsonRpcRequest::new(1, "tools/list", Value::Null);
        let encoded = serde_json::to_string(&request).unwrap();
        assert!(!encoded.contains("params"));
    }

    #[test]
    fn test_success_response_into_result() {
        let raw = r#"{"jsonrpc":"2.0","result":{"tools":[]},"id":2}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(response.numeric_id(), Some(2));
        let result = response.into_result("tools/list").unwrap();
        assert_eq!(result, json!({"tools": []}));
    }

    #[test]
    fn test_error_response_into_result() {
        let raw = r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":3}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();

        let err = response.into_result("resources/list").unwrap_err();
        assert!(err.is_method_not_found());
    }

    #[test]
    fn test_empty_response_is_transport_error() {
        let raw = r#"{"jsonrpc":"2.0","id":4}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();

        let err = response.into_result("initialize").unwrap_err();
        assert!(matches!(err, HermesError::Transport(_)));
    }

    #[test]
    fn test_non_numeric_id_is_unmatched() {
        let raw = r#"{"jsonrpc":"2.0","result":{},"id":"abc"}"#;
        let response: JsonRpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.numeric_id(), None);
    }
}
