//! Stdio transport: newline-delimited JSON-RPC over a child process
//!
//! Spawns the external MCP server and frames its stdout into lines. A
//! background reader task resolves pending callers by response id; a late
//! or unmatched reply is discarded (with a diagnostic) rather than
//! crashing the channel.

use crate::error::{HermesError, Result};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::{Channel, REQUEST_TIMEOUT};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, warn};

/// In-flight requests awaiting a reply, keyed by request id.
///
/// An entry is removed when the matching reply arrives or when the caller
/// times out, whichever comes first; ids are never reused.
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Correlated request channel over a child process's stdin/stdout
pub struct StdioChannel {
    next_id: AtomicU64,
    pending: PendingMap,
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    timeout: Duration,
    // Keeps the child alive for the channel's lifetime; kill_on_drop
    // terminates it when the channel goes away.
    _child: Option<Child>,
}

impl StdioChannel {
    /// Spawn the external server and attach to its pipes.
    ///
    /// The child's stderr is inherited so its own logging stays visible;
    /// readiness is established by the first `initialize` round-trip, not
    /// by scraping log output.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HermesError::Transport(format!("failed to spawn '{program}': {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HermesError::Transport("child stdout was not captured".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HermesError::Transport("child stdin was not captured".to_string()))?;

        Ok(Self::build(stdout, stdin, Some(child)))
    }

    /// Attach to caller-supplied streams instead of spawning a process.
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(reader, writer, None)
    }

    /// Override the per-request timeout (default [`REQUEST_TIMEOUT`]).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(Self::read_loop(reader, Arc::clone(&pending)));

        Self {
            next_id: AtomicU64::new(1),
            pending,
            writer: Mutex::new(Box::new(writer)),
            timeout: REQUEST_TIMEOUT,
            _child: child,
        }
    }

    /// Drain the server's stdout, resolving pending callers by id.
    ///
    /// Malformed records are skipped; replies whose id has no pending
    /// caller (already timed out, or never ours) are discarded. When the
    /// stream ends, outstanding callers are failed by dropping their
    /// senders.
    async fn read_loop<R>(reader: R, pending: PendingMap)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new());

        while let Some(item) = lines.next().await {
            let line = match item {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdio framing error, closing channel: {}", e);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response: JsonRpcResponse = match serde_json::from_str(line) {
                Ok(response) => response,
                Err(e) => {
                    warn!("skipping unparsable record from server: {}", e);
                    continue;
                }
            };

            let Some(id) = response.numeric_id() else {
                debug!("discarding reply without a numeric id");
                continue;
            };

            match pending.lock().await.remove(&id) {
                // The receiver may already be gone (timed out); that is a
                // normal discard, not an error.
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => debug!(id, "discarding reply with no pending caller"),
            }
        }

        debug!("stdio transport closed, failing outstanding requests");
        pending.lock().await.clear();
    }
}

#[async_trait]
impl Channel for StdioChannel {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        debug!(id, method, "sending request");
        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(line.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.remove(&id);
            return Err(HermesError::Transport(format!("write to server failed: {e}")));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response.into_result(method),
            Ok(Err(_)) => Err(HermesError::Transport(
                "channel closed before a reply arrived".to_string(),
            )),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(HermesError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn test_round_trip_over_duplex() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let (client_read, client_write) = tokio::io::split(client_io);

        // Echo server: replies to each request with its id
        tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: JsonRpcRequest = serde_json::from_str(&line).unwrap();
                let reply = json!({
                    "jsonrpc": "2.0",
                    "result": {"echo": request.method},
                    "id": request.id,
                });
                server_write
                    .write_all(format!("{reply}\n").as_bytes())
                    .await
                    .unwrap();
            }
        });

        let channel = StdioChannel::from_streams(client_read, client_write);
        let result = channel.request("tools/list", json!({})).await.unwrap();
        assert_eq!(result, json!({"echo": "tools/list"}));
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let (client_io, _server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let channel = StdioChannel::from_streams(client_read, client_write)
            .with_timeout(Duration::from_millis(20));

        // Both time out (no server), but must have distinct, increasing ids
        let first = channel.next_id.load(Ordering::SeqCst);
        let _ = channel.request("a", Value::Null).await;
        let _ = channel.request("b", Value::Null).await;
        assert_eq!(channel.next_id.load(Ordering::SeqCst), first + 2);
        assert!(channel.pending.lock().await.is_empty());
    }
}
