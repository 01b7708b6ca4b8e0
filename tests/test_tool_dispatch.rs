//! End-to-end dispatch tests through the MCP server
//!
//! Drives the dispatcher the way the HTTP transport would and checks the
//! observable outcomes: tool results, metrics accounting, and the health
//! snapshot derived from them.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vault_mcp::config::ToolConfig;
use vault_mcp::mcp::protocol::{JsonRpcRequest, RequestId, JSONRPC_VERSION};
use vault_mcp::mcp::JsonRpcMessage;
use vault_mcp::observability::health::health_check;
use vault_mcp::observability::stats::ServerStats;
use vault_mcp::tools::ToolSystem;
use vault_mcp::McpServer;

async fn build_server() -> (Arc<McpServer>, Arc<ServerStats>) {
    let stats = Arc::new(ServerStats::new());
    let mut tools = ToolSystem::new(Arc::clone(&stats));
    let mut configs = HashMap::new();
    configs.insert(
        "greeter".to_string(),
        ToolConfig::Simple("builtin".to_string()),
    );
    configs.insert(
        "health_check".to_string(),
        ToolConfig::Simple("builtin".to_string()),
    );
    tools.initialize(&configs).await.unwrap();

    let server = Arc::new(McpServer::new(
        "Vault Clinical MCP Server",
        tools,
        Arc::clone(&stats),
    ));
    (server, stats)
}

fn call_tool_request(name: &str, arguments: Value) -> JsonRpcMessage {
    JsonRpcMessage::Request(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: "tools/call".to_string(),
        params: Some(json!({"name": name, "arguments": arguments})),
        id: RequestId::Number(1),
    })
}

fn result_of(message: Option<JsonRpcMessage>) -> Value {
    match message {
        Some(JsonRpcMessage::Response(response)) => response.result,
        other => panic!("expected success response, got {other:?}"),
    }
}

fn text_content(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn test_greeter_empty_input_gets_default_encouragement() {
    let (server, stats) = build_server().await;

    let result = result_of(
        server
            .handle_message(call_tool_request("greeter", json!({"input": ""})))
            .await,
    );

    assert_eq!(result["isError"], false);
    assert!(text_content(&result).contains("Congrats on your first MCP tool!"));

    // The invocation was recorded as a success.
    assert_eq!(stats.total_requests(), 1);
    assert_eq!(stats.successful_requests(), 1);
    assert_eq!(stats.failed_requests(), 0);
}

#[tokio::test]
async fn test_greeter_normal_input() {
    let (server, _stats) = build_server().await;

    let result = result_of(
        server
            .handle_message(call_tool_request("greeter", json!({"input": "Dr. Chen"})))
            .await,
    );

    assert_eq!(text_content(&result), "Hello Dr. Chen! Dr. Chen");
}

#[tokio::test]
async fn test_health_check_tool_reflects_outcomes() {
    let (server, stats) = build_server().await;

    // Simulate 7 successful and 3 failed invocations of tool "x".
    for _ in 0..7 {
        stats.record_tool_call("x", true, Duration::ZERO);
    }
    for _ in 0..3 {
        stats.record_tool_call("x", false, Duration::ZERO);
    }

    let result = result_of(
        server
            .handle_message(call_tool_request("health_check", json!({})))
            .await,
    );

    let health: Value = serde_json::from_str(text_content(&result)).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["success_rate"], 70.0);
    // 10 simulated calls plus the health_check invocation itself.
    assert_eq!(health["total_requests"], 10);
    assert_eq!(stats.total_requests(), 11);
}

#[tokio::test]
async fn test_health_check_matches_standalone_snapshot() {
    let (server, stats) = build_server().await;

    let result = result_of(
        server
            .handle_message(call_tool_request("health_check", json!({})))
            .await,
    );
    let via_tool: Value = serde_json::from_str(text_content(&result)).unwrap();
    let direct: Value = serde_json::from_str(&health_check(&stats)).unwrap();

    assert_eq!(via_tool["status"], direct["status"]);
}

#[tokio::test]
async fn test_full_session_flow() {
    let (server, stats) = build_server().await;

    let initialize = JsonRpcMessage::Request(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: "initialize".to_string(),
        params: Some(json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {"name": "inspector", "version": "0.1.0"}
        })),
        id: RequestId::Number(1),
    });
    let init_result = result_of(server.handle_message(initialize).await);
    assert_eq!(init_result["serverInfo"]["name"], "Vault Clinical MCP Server");

    let list = JsonRpcMessage::Request(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: "tools/list".to_string(),
        params: None,
        id: RequestId::Number(2),
    });
    let list_result = result_of(server.handle_message(list).await);
    let names: Vec<&str> = list_result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"greeter"));
    assert!(names.contains(&"health_check"));

    let call_result = result_of(
        server
            .handle_message(call_tool_request("greeter", json!({"input": "team"})))
            .await,
    );
    assert_eq!(call_result["isError"], false);

    assert_eq!(stats.protocol_call_count("initialize"), 1);
    assert_eq!(stats.protocol_call_count("tools/list"), 1);
    assert_eq!(stats.protocol_call_count("tools/call"), 1);
    assert_eq!(stats.total_requests(), 1);
}

#[tokio::test]
async fn test_failed_validation_counts_against_tool() {
    let (server, stats) = build_server().await;

    let result = result_of(
        server
            .handle_message(call_tool_request("greeter", json!({"wrong_field": true})))
            .await,
    );

    assert_eq!(result["isError"], true);
    let tool = stats.tool_call_stats("greeter").unwrap();
    assert_eq!(tool.calls, 1);
    assert_eq!(tool.errors, 1);
    assert!(tool.errors <= tool.calls);
}
