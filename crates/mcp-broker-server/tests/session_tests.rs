//! Session-dispatcher integration tests against an empty downstream pool —
//! enough to pin request-routing, id-echoing, and error-mapping behavior
//! without needing a live child process.

use std::collections::HashMap;
use std::sync::Arc;

use mcp_broker_core::{ClientManager, ToolAggregator};
use mcp_broker_server::BrokerSession;
use serde_json::json;

fn session(require_auth: bool) -> BrokerSession {
    let manager = ClientManager::start(HashMap::new());
    let aggregator = Arc::new(ToolAggregator::new(manager));
    BrokerSession::new(aggregator, None, require_auth)
}

#[tokio::test]
async fn initialize_always_succeeds() {
    let mut session = session(true);
    let response = session
        .handle(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
        .await
        .unwrap();
    assert_eq!(response.id, 1);
    assert!(!response.is_error());
    let result = response.into_result().unwrap();
    assert_eq!(result["serverInfo"]["name"], "McpBroker");
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let mut session = session(true);
    let response = session
        .handle(json!({"jsonrpc": "2.0", "id": 2, "method": "frobnicate"}))
        .await
        .unwrap();
    let err = response.into_result().unwrap_err();
    assert_eq!(err.code, -32601);
}

#[tokio::test]
async fn garbage_with_id_is_invalid_request() {
    let mut session = session(true);
    let response = session.handle(json!({"id": 9, "foo": "bar"})).await.unwrap();
    assert_eq!(response.id, 9);
    assert_eq!(response.into_result().unwrap_err().code, -32600);
}

#[tokio::test]
async fn garbage_without_id_yields_no_response() {
    let mut session = session(true);
    assert!(session.handle(json!({"foo": "bar"})).await.is_none());
}

#[tokio::test]
async fn notification_is_absorbed() {
    let mut session = session(true);
    let response = session
        .handle(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn tools_list_on_empty_pool_returns_empty_catalog() {
    let mut session = session(true);
    let response = session
        .handle(json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}))
        .await
        .unwrap();
    let result = response.into_result().unwrap();
    assert_eq!(result["tools"], json!([]));
}

#[tokio::test]
async fn calling_unknown_tool_is_access_denied_not_tool_not_found() {
    let mut session = session(true);
    let response = session
        .handle(json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "nonexistent", "arguments": {}}
        }))
        .await
        .unwrap();
    let err = response.into_result().unwrap_err();
    assert_eq!(err.code, -32603);
    assert_eq!(err.data.unwrap()["reason"], "access_denied");
}

#[tokio::test]
async fn tool_call_rejects_invalid_name_pattern() {
    let mut session = session(true);
    let response = session
        .handle(json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": {"name": "bad name!", "arguments": {}}
        }))
        .await
        .unwrap();
    assert_eq!(response.into_result().unwrap_err().code, -32602);
}

#[tokio::test]
async fn tool_call_rejects_oversized_arguments() {
    let mut session = session(true);
    let mut arguments = serde_json::Map::new();
    for i in 0..101 {
        arguments.insert(format!("k{i}"), json!(i));
    }
    let response = session
        .handle(json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": {"name": "echo", "arguments": arguments}
        }))
        .await
        .unwrap();
    assert_eq!(response.into_result().unwrap_err().code, -32602);
}

#[tokio::test]
async fn authenticate_without_configured_verifier_is_server_not_available() {
    let mut session = session(true);
    let response = session
        .handle(json!({
            "jsonrpc": "2.0", "id": 7, "method": "authenticate",
            "params": {"jwt_token": "whatever"}
        }))
        .await
        .unwrap();
    let err = response.into_result().unwrap_err();
    assert_eq!(err.code, -32603);
    assert_eq!(err.data.unwrap()["reason"], "server_not_available");
}
