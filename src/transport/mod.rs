//! HTTP transport for the MCP server
//!
//! Serves the MCP endpoint at `POST /mcp` over warp. Access records pass
//! through the noise filter before the request summary logger sees them,
//! and the server shuts down gracefully when the shutdown signal flips.

use crate::error::ServerError;
use crate::mcp::protocol::JsonRpcMessage;
use crate::mcp::server::McpServer;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use warp::Filter;

pub mod filter;

pub use filter::{log_request_summary, NoiseFilter, SummaryAction};

/// Build the warp route tree for the MCP endpoint
pub fn routes(
    server: Arc<McpServer>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let noise_filter = NoiseFilter::new();
    let access = warp::log::custom(move |info| {
        filter::access_log(
            &noise_filter,
            info.method().as_str(),
            info.path(),
            info.status().as_u16(),
            info.status().canonical_reason().unwrap_or(""),
            info.elapsed().as_secs_f64(),
        );
    });

    warp::path("mcp")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_server(server))
        .and_then(handle_rpc)
        .with(access)
}

/// Serve the MCP endpoint until the shutdown signal flips
pub async fn serve(
    server: Arc<McpServer>,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let (bound, serving) = warp::serve(routes(server))
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown.changed().await;
        })
        .map_err(|e| ServerError::transport(format!("failed to bind {addr}: {e}")))?;

    info!("MCP transport listening on {}", bound);
    serving.await;
    info!("MCP transport stopped");
    Ok(())
}

fn with_server(
    server: Arc<McpServer>,
) -> impl Filter<Extract = (Arc<McpServer>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&server))
}

async fn handle_rpc(
    message: JsonRpcMessage,
    server: Arc<McpServer>,
) -> Result<impl warp::Reply, Infallible> {
    match server.handle_message(message).await {
        Some(response) => Ok(warp::reply::json(&response)),
        // Notifications produce no response body
        None => Ok(warp::reply::json(&serde_json::json!({}))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::observability::stats::ServerStats;
    use crate::tools::ToolSystem;
    use std::collections::HashMap;

    async fn test_server() -> Arc<McpServer> {
        let stats = Arc::new(ServerStats::new());
        let mut tools = ToolSystem::new(Arc::clone(&stats));
        let mut configs = HashMap::new();
        configs.insert(
            "greeter".to_string(),
            ToolConfig::Simple("builtin".to_string()),
        );
        tools.initialize(&configs).await.unwrap();
        Arc::new(McpServer::new("Test MCP Server", tools, stats))
    }

    #[tokio::test]
    async fn test_mcp_route_dispatches_tool_call() {
        let server = test_server().await;
        let routes = routes(server);

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {"name": "greeter", "arguments": {"input": "Ada"}},
            "id": 1
        });
        let response = warp::test::request()
            .method("POST")
            .path("/mcp")
            .json(&body)
            .reply(&routes)
            .await;

        assert_eq!(response.status(), 200);
        let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(parsed["result"]["content"][0]["text"], "Hello Ada! Ada");
    }

    #[tokio::test]
    async fn test_mcp_route_answers_notifications_with_empty_body() {
        let server = test_server().await;
        let routes = routes(server);

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "initialized"
        });
        let response = warp::test::request()
            .method("POST")
            .path("/mcp")
            .json(&body)
            .reply(&routes)
            .await;

        assert_eq!(response.status(), 200);
        let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(parsed, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_unknown_path_is_rejected() {
        let server = test_server().await;
        let routes = routes(server);

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;

        // Monitoring probes on unserved paths come back as 404s; the
        // access-log filter keeps them out of the logs.
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_serve_binds_and_shuts_down() {
        let server = test_server().await;
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(serve(server, addr, shutdown_rx));

        // Give the server a moment to bind, then signal shutdown.
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_serve_rejects_unbindable_address() {
        let server = test_server().await;
        // TEST-NET address that no local interface carries.
        let addr: SocketAddr = "203.0.113.1:9".parse().unwrap();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = serve(server, addr, shutdown_rx).await;
        assert!(matches!(result, Err(ServerError::Transport { .. })));
    }
}
