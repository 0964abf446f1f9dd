//! HTTP transport: one POST per request, session correlation by header
//!
//! The server assigns a session identifier during `initialize` and expects
//! it back on every subsequent call via the `mcp-session-id` header. The
//! server may answer with a plain JSON body or with an event-stream body,
//! in which case the first well-formed `data:` record is the envelope.

use crate::error::{HermesError, Result};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::{Channel, REQUEST_TIMEOUT};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header the server uses to assign and correlate sessions
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Correlated request channel over HTTP POST
pub struct HttpChannel {
    http: reqwest::Client,
    url: String,
    bearer: Option<String>,
    // Write-once: assigned by the server's initialize response, fixed for
    // the channel's lifetime. Later reassignment attempts are ignored.
    session: OnceCell<String>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl HttpChannel {
    /// Create a channel for the given endpoint, with an optional bearer token
    pub fn new(url: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            bearer,
            session: OnceCell::new(),
            next_id: AtomicU64::new(1),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout (default [`REQUEST_TIMEOUT`]).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The session identifier captured from `initialize`, if any
    pub fn session_id(&self) -> Option<&str> {
        self.session.get().map(String::as_str)
    }

    /// Poll the endpoint until it accepts connections.
    ///
    /// Any HTTP status counts as "listening" — the point is to replace
    /// log-scraping readiness checks with a direct probe. Connection
    /// failures are retried up to `attempts` times, `interval` apart.
    pub async fn probe_ready(&self, attempts: u32, interval: Duration) -> Result<()> {
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.http.get(&self.url).send().await {
                Ok(response) => {
                    debug!(status = %response.status(), attempt, "endpoint is listening");
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt, "endpoint not ready yet: {}", e);
                    last_error = e.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(HermesError::Transport(format!(
            "endpoint {} not reachable after {} attempts: {}",
            self.url, attempts, last_error
        )))
    }

    /// Capture the session id assigned by `initialize`, exactly once.
    ///
    /// The cell is write-once: a server that hands out a different id on a
    /// later response cannot silently re-bind the session mid-flight.
    fn observe_session(&self, method: &str, response: &reqwest::Response) {
        let Some(assigned) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };

        match self.session.get() {
            None if method == "initialize" => {
                if self.session.set(assigned.to_string()).is_ok() {
                    info!(session = assigned, "session established");
                }
            }
            None => debug!(
                method,
                "ignoring session id offered outside initialize"
            ),
            Some(current) if current != assigned => warn!(
                current,
                offered = assigned,
                "server attempted to reassign the session id; keeping the original"
            ),
            Some(_) => {}
        }
    }

    /// Pull the response envelope out of an event-stream body.
    ///
    /// The first well-formed JSON record among the `data:` lines wins;
    /// malformed records are skipped without raising.
    fn extract_sse_envelope(body: &str) -> Option<JsonRpcResponse> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .find_map(|data| match serde_json::from_str(data) {
                Ok(envelope) => Some(envelope),
                Err(e) => {
                    debug!("skipping unparsable event-stream record: {}", e);
                    None
                }
            })
    }

    async fn round_trip(&self, id: u64, method: &str, params: Value) -> Result<JsonRpcResponse> {
        let envelope = JsonRpcRequest::new(id, method, params);

        let mut builder = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/event-stream")
            .json(&envelope);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        // The server assigns the session during initialize; that one call
        // must go out without a correlation header.
        if method != "initialize" {
            if let Some(session) = self.session.get() {
                builder = builder.header(SESSION_HEADER, session.as_str());
            }
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HermesError::Transport(format!(
                "POST {} returned {}: {}",
                self.url,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        self.observe_session(method, &response);

        let event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);

        let body = response.text().await?;
        if event_stream {
            Self::extract_sse_envelope(&body).ok_or_else(|| {
                HermesError::Transport("event-stream body carried no envelope".to_string())
            })
        } else {
            serde_json::from_str(&body).map_err(|e| {
                HermesError::Transport(format!("malformed response body for '{method}': {e}"))
            })
        }
    }
}

#[async_trait]
impl Channel for HttpChannel {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(id, method, "sending request");

        let response = match tokio::time::timeout(self.timeout, self.round_trip(id, method, params))
            .await
        {
            Ok(outcome) => outcome?,
            Err(_) => {
                return Err(HermesError::Timeout {
                    method: method.to_string(),
                })
            }
        };

        // At most one envelope per HTTP call on this transport; an id that
        // does not match is an unmatched reply and cannot resolve this call.
        if response.numeric_id() != Some(id) {
            warn!(
                expected = id,
                got = ?response.id,
                "discarding response whose id does not match the request"
            );
            return Err(HermesError::Transport(
                "response id did not match the request".to_string(),
            ));
        }

        response.into_result(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_extraction_takes_first_wellformed_record() {
        let body = "event: message\ndata: {not json\ndata: {\"jsonrpc\":\"2.0\",\"result\":{\"ok\":true},\"id\":1}\ndata: {\"jsonrpc\":\"2.0\",\"result\":{},\"id\":2}\n";
        let envelope = HttpChannel::extract_sse_envelope(body).unwrap();
        assert_eq!(envelope.numeric_id(), Some(1));
    }

    #[test]
    fn test_sse_extraction_empty_stream() {
        assert!(HttpChannel::extract_sse_envelope("event: ping\n\n").is_none());
        assert!(HttpChannel::extract_sse_envelope("").is_none());
    }

    #[test]
    fn test_sse_extraction_skips_blank_data_lines() {
        let body = "data:\ndata: {\"jsonrpc\":\"2.0\",\"result\":{},\"id\":9}\n";
        let envelope = HttpChannel::extract_sse_envelope(body).unwrap();
        assert_eq!(envelope.numeric_id(), Some(9));
    }

    #[test]
    fn test_session_starts_unset() {
        let channel = HttpChannel::new("http://localhost:9/mcp", None);
        assert_eq!(channel.session_id(), None);
    }
}
