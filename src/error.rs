//! Error types for the Hermes MCP client harness
//!
//! This module provides structured error handling using thiserror, following
//! the taxonomy of the protocol layer: configuration problems abort before
//! any network activity, transport and timeout conditions are distinct so
//! callers can tell "no answer" from "error answer", and the remote server's
//! own JSON-RPC errors are propagated verbatim.

use crate::mcp::protocol::METHOD_NOT_FOUND;
use thiserror::Error;

/// Main error type for Hermes operations
#[derive(Error, Debug)]
pub enum HermesError {
    /// Required credential or endpoint missing or invalid
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Connection refused, malformed framing, unexpected status code
    #[error("Transport error: {0}")]
    Transport(String),

    /// No matching response arrived within the request window
    #[error("Request timed out: {method}")]
    Timeout { method: String },

    /// The remote server's own JSON-RPC error, propagated verbatim
    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },

    /// The bounded tool loop made no forward progress within its ceiling
    #[error("Tool loop exhausted after {rounds} rounds without a final answer")]
    IterationBudget { rounds: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HermesError {
    /// Shorthand for a configuration error with a plain message
    pub fn config(message: impl Into<String>) -> Self {
        HermesError::Config(config::ConfigError::Message(message.into()))
    }

    /// True when this is the remote method-not-found error.
    ///
    /// Callers that probe optional methods (e.g. `resources/list`) treat
    /// this as "feature unavailable" rather than a failure.
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, HermesError::Remote { code, .. } if *code == METHOD_NOT_FOUND)
    }
}

/// HTTP-level failures are transport failures from the channel's perspective
impl From<reqwest::Error> for HermesError {
    fn from(err: reqwest::Error) -> Self {
        HermesError::Transport(err.to_string())
    }
}

/// Result type alias for Hermes operations
pub type Result<T> = std::result::Result<T, HermesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HermesError::Timeout {
            method: "tools/call".to_string(),
        };
        assert_eq!(err.to_string(), "Request timed out: tools/call");

        let err = HermesError::Remote {
            code: -32000,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Remote error -32000: boom");
    }

    #[test]
    fn test_method_not_found_detection() {
        let soft = HermesError::Remote {
            code: METHOD_NOT_FOUND,
            message: "Method not found: resources/list".to_string(),
        };
        assert!(soft.is_method_not_found());

        let hard = HermesError::Remote {
            code: -32603,
            message: "internal".to_string(),
        };
        assert!(!hard.is_method_not_found());
        assert!(!HermesError::config("missing key").is_method_not_found());
    }
}
