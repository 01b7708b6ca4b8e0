//! MCP request dispatcher
//!
//! Routes JSON-RPC messages to the tool system and records every protocol
//! call and tool outcome in the shared server statistics. A tool failure
//! is never a protocol fault: it comes back as an error-shaped tool result
//! with sanitized text.

use crate::error::sanitize_error_message;
use crate::mcp::protocol::*;
use crate::observability::stats::ServerStats;
use crate::tools::ToolSystem;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Connection state tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
}

/// MCP server state
pub struct McpServer {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    tools: ToolSystem,
    stats: Arc<ServerStats>,
    state: RwLock<ConnectionState>,
    session_id: RwLock<Option<Uuid>>,
}

impl McpServer {
    /// Create a new MCP server around an initialized tool system
    pub fn new(name: &str, tools: ToolSystem, stats: Arc<ServerStats>) -> Self {
        let server_info = Implementation {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let capabilities = ServerCapabilities {
            logging: Some(LoggingCapability {}),
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        };

        Self {
            server_info,
            capabilities,
            tools,
            stats,
            state: RwLock::new(ConnectionState::Uninitialized),
            session_id: RwLock::new(None),
        }
    }

    /// Names of the registered tools
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.list_tools()
    }

    /// Current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.state.read().await.clone()
    }

    /// Session id assigned during the initialize handshake
    pub async fn session_id(&self) -> Option<Uuid> {
        *self.session_id.read().await
    }

    /// Process an incoming message; requests yield a response, everything
    /// else yields nothing
    pub async fn handle_message(&self, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        self.stats
            .record_protocol_call(&request.method, request.params.as_ref());

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(json!({})),
            _ => Err(JsonRpcError::method_not_found()),
        };

        match result {
            Ok(value) => JsonRpcMessage::Response(JsonRpcResponse::new(value, request.id)),
            Err(error) => {
                JsonRpcMessage::ErrorResponse(JsonRpcErrorResponse::new(error, Some(request.id)))
            }
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                *self.state.write().await = ConnectionState::Ready;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => {}
            other => warn!("Unknown notification method: {}", other),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(Some(e.to_string())))?,
            None => {
                return Err(JsonRpcError::invalid_params(Some(
                    "initialize requires parameters".to_string(),
                )))
            }
        };

        let session = Uuid::new_v4();
        *self.session_id.write().await = Some(session);
        *self.state.write().await = ConnectionState::Initializing;

        info!(
            "Client initialized: {} | Session: {}",
            params.client_info.name, session
        );

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: Some("Clinical document MCP server".to_string()),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(Some(e.to_string())))
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = self
            .tools
            .descriptions()
            .into_iter()
            .map(|description| ToolSpec {
                name: description.name,
                description: Some(description.description),
                input_schema: description.parameters,
            })
            .collect();

        serde_json::to_value(ListToolsResult { tools })
            .map_err(|e| JsonRpcError::internal_error(Some(e.to_string())))
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(Some(e.to_string())))?,
            None => {
                return Err(JsonRpcError::invalid_params(Some(
                    "tools/call requires parameters".to_string(),
                )))
            }
        };

        if !self.tools.has_tool(&params.name) {
            return Err(JsonRpcError::tool_not_found(&params.name));
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let started = Instant::now();
        let outcome = self.tools.execute_tool(&params.name, &arguments).await;
        let duration = started.elapsed();

        let result = match outcome {
            Ok(value) => {
                self.stats.record_tool_call(&params.name, true, duration);
                CallToolResult::text(render_tool_output(value)?)
            }
            Err(e) => {
                self.stats.record_tool_call(&params.name, false, duration);
                CallToolResult::error(sanitize_error_message(&e.to_string()))
            }
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(Some(e.to_string())))
    }
}

/// Render a tool's return value as text content
fn render_tool_output(value: Value) -> Result<String, JsonRpcError> {
    match value {
        Value::String(text) => Ok(text),
        other => serde_json::to_string(&other)
            .map_err(|e| JsonRpcError::internal_error(Some(e.to_string()))),
    }
}
