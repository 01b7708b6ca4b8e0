//! MCP (Model Context Protocol) layer
//!
//! JSON-RPC 2.0 message types and the request dispatcher. The transport
//! carries messages to `McpServer::handle_message`; tool semantics live in
//! the tool system.

pub mod protocol;
pub mod server;

pub use protocol::{JsonRpcMessage, JsonRpcRequest, RequestId};
pub use server::{ConnectionState, McpServer};
