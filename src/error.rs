//! Error types for the MCP server
//!
//! Setup failures abort startup; everything below the tool boundary is
//! caught, recorded, and converted to an error-shaped result instead of
//! terminating the process.

use crate::config::ConfigError;
use crate::tools::ToolError;
use thiserror::Error;

/// Main error type for server operations
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Setup failed: {message}")]
    Setup { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl ServerError {
    /// Create a setup error
    pub fn setup<S: Into<String>>(message: S) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Sanitize error messages before they are handed back to protocol clients
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    // Remove common secret patterns
    sanitized = regex::Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+")
        .unwrap()
        .replace_all(&sanitized, "${1}=***")
        .to_string();

    // Remove potential file paths that might contain sensitive info
    sanitized =
        regex::Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
            .unwrap()
            .replace_all(&sanitized, "/***REDACTED***/")
            .to_string();

    // Truncate very long messages - ensure total length is <= 500
    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let max_content_len = 500 - truncate_suffix.len();
        sanitized = format!("{}{}", &sanitized[..max_content_len], truncate_suffix);
    }

    sanitized
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
