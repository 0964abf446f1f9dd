//! Integration tests for the stdio correlated request channel
//!
//! Drives a StdioChannel against an in-process fake server over a duplex
//! pipe, covering id correlation, out-of-order delivery, timeout discard,
//! malformed framing, and transport closure.

use hermes_core::mcp::protocol::JsonRpcRequest;
use hermes_core::{Channel, HermesError, McpClient, StdioChannel};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

/// Wire up a channel and hand the test the server side of the pipe
fn channel_with_server_side(
    timeout: Duration,
) -> (StdioChannel, ReadHalf<DuplexStream>, WriteHalf<DuplexStream>) {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (server_read, server_write) = tokio::io::split(server_io);

    let channel = StdioChannel::from_streams(client_read, client_write).with_timeout(timeout);
    (channel, server_read, server_write)
}

async fn next_request(
    lines: &mut tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
) -> JsonRpcRequest {
    let line = lines.next_line().await.unwrap().unwrap();
    serde_json::from_str(&line).unwrap()
}

async fn write_line(writer: &mut WriteHalf<DuplexStream>, payload: &Value) {
    writer
        .write_all(format!("{payload}\n").as_bytes())
        .await
        .unwrap();
}

#[tokio::test]
async fn tools_list_round_trip_yields_catalog() {
    let (channel, server_read, mut server_write) = channel_with_server_side(Duration::from_secs(5));

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let request = next_request(&mut lines).await;
        assert_eq!(request.method, "tools/list");
        let reply = json!({
            "jsonrpc": "2.0",
            "result": {"tools": [{"name": "search"}]},
            "id": request.id,
        });
        write_line(&mut server_write, &reply).await;
    });

    let client = McpClient::new(Arc::new(channel));
    let tools = client.list_tools().await.unwrap();

    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "search");
}

#[tokio::test]
async fn out_of_order_replies_resolve_by_id() {
    let (channel, server_read, mut server_write) = channel_with_server_side(Duration::from_secs(5));

    // Read both requests first, then answer them in reverse order
    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let first = next_request(&mut lines).await;
        let second = next_request(&mut lines).await;

        write_line(
            &mut server_write,
            &json!({"jsonrpc": "2.0", "result": {"method": second.method}, "id": second.id}),
        )
        .await;
        write_line(
            &mut server_write,
            &json!({"jsonrpc": "2.0", "result": {"method": first.method}, "id": first.id}),
        )
        .await;
    });

    let channel = Arc::new(channel);
    let (a, b) = tokio::join!(
        channel.request("alpha", json!({})),
        channel.request("beta", json!({})),
    );

    assert_eq!(a.unwrap(), json!({"method": "alpha"}));
    assert_eq!(b.unwrap(), json!({"method": "beta"}));
}

#[tokio::test]
async fn late_reply_is_discarded_and_channel_stays_usable() {
    let (channel, server_read, mut server_write) =
        channel_with_server_side(Duration::from_millis(50));

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();

        // First request: answer well after the caller's timeout
        let first = next_request(&mut lines).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        write_line(
            &mut server_write,
            &json!({"jsonrpc": "2.0", "result": {"stale": true}, "id": first.id}),
        )
        .await;

        // Second request: answer promptly
        let second = next_request(&mut lines).await;
        write_line(
            &mut server_write,
            &json!({"jsonrpc": "2.0", "result": {"fresh": true}, "id": second.id}),
        )
        .await;
    });

    let err = channel.request("slow/method", json!({})).await.unwrap_err();
    assert!(matches!(err, HermesError::Timeout { ref method } if method == "slow/method"));

    // Wait until the stale reply has arrived and been discarded
    tokio::time::sleep(Duration::from_millis(250)).await;

    let fresh = channel.request("fast/method", json!({})).await.unwrap();
    assert_eq!(fresh, json!({"fresh": true}));
}

#[tokio::test]
async fn malformed_records_are_skipped() {
    let (channel, server_read, mut server_write) = channel_with_server_side(Duration::from_secs(5));

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let request = next_request(&mut lines).await;

        server_write.write_all(b"{not json at all\n").await.unwrap();
        server_write.write_all(b"\n").await.unwrap();
        write_line(
            &mut server_write,
            &json!({"jsonrpc": "2.0", "result": {"ok": true}, "id": request.id}),
        )
        .await;
    });

    let result = channel.request("tools/call", json!({})).await.unwrap();
    assert_eq!(result, json!({"ok": true}));
}

#[tokio::test]
async fn remote_error_surfaces_verbatim() {
    let (channel, server_read, mut server_write) = channel_with_server_side(Duration::from_secs(5));

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let request = next_request(&mut lines).await;
        write_line(
            &mut server_write,
            &json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found: resources/list"},
                "id": request.id,
            }),
        )
        .await;
    });

    let err = channel.request("resources/list", json!({})).await.unwrap_err();
    assert!(err.is_method_not_found());
}

#[tokio::test]
async fn optional_method_not_found_reads_as_unavailable() {
    let (channel, server_read, mut server_write) = channel_with_server_side(Duration::from_secs(5));

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let request = next_request(&mut lines).await;
        write_line(
            &mut server_write,
            &json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": request.id,
            }),
        )
        .await;
    });

    let client = McpClient::new(Arc::new(channel));
    assert_eq!(client.list_resources().await.unwrap(), None);
}

#[tokio::test]
async fn transport_close_fails_pending_requests() {
    let (channel, server_read, server_write) = channel_with_server_side(Duration::from_secs(5));

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        let _request = next_request(&mut lines).await;
        // Close without answering
        drop(server_write);
        drop(lines);
    });

    let err = channel.request("tools/call", json!({})).await.unwrap_err();
    assert!(matches!(err, HermesError::Transport(_)), "got {err:?}");
}
