//! Vault Clinical MCP Server
//!
//! A minimal MCP server exposing a small set of remote-callable tools over
//! JSON-RPC on HTTP, with structured logging and periodic health reporting.
//!
//! # Overview
//!
//! This crate provides:
//! - Structured logging with dual sinks (stderr + size-rotating file)
//! - Aggregate server statistics shared across concurrent tool invocations
//! - Timer-driven health reporting and an on-demand health check tool
//! - Noise filtering for transport access records
//! - A trait-based tool system with JSON-Schema argument validation
//!
//! # Quick Start
//!
//! ```rust
//! use vault_mcp::observability::stats::ServerStats;
//! use vault_mcp::observability::health::health_check;
//! use std::time::Duration;
//!
//! let stats = ServerStats::new();
//! stats.record_tool_call("greeter", true, Duration::from_millis(3));
//!
//! let snapshot = health_check(&stats);
//! assert!(snapshot.contains("\"status\":\"healthy\""));
//! ```

pub mod config;
pub mod error;
pub mod mcp;
pub mod observability;
pub mod tools;
pub mod transport;

pub use config::{ServerConfig, ToolConfig};
pub use error::{sanitize_error_message, ServerError, ServerResult};
pub use mcp::server::McpServer;
pub use observability::{health::HealthReporter, logging::init_logging, stats::ServerStats};
pub use tools::{Tool, ToolDescription, ToolError, ToolSystem};
pub use transport::NoiseFilter;
