//! Configuration for the MCP server
//!
//! TOML-backed configuration with full defaults so the server can run
//! without a file. The `[tools]` table selects which tool implementations
//! are registered at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Main server configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default = "default_tools")]
    pub tools: HashMap<String, ToolConfig>,
}

/// Server identity and bind address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Human-readable server name reported during the MCP handshake
    #[serde(default = "default_name")]
    pub name: String,
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Periodic health report scheduling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSection {
    /// Delay before the first health report (default: 60 seconds)
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Interval between subsequent reports (default: 300 seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolConfig {
    /// Simple form: tool_name = "identifier"
    Simple(String),
    /// Complex form: tool_name = { impl = "identifier", config = { ... } }
    Complex {
        #[serde(rename = "impl")]
        implementation: String,
        #[serde(default)]
        config: HashMap<String, serde_json::Value>,
    },
}

fn default_name() -> String {
    "Vault Clinical MCP Server".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_initial_delay_secs() -> u64 {
    60
}

fn default_interval_secs() -> u64 {
    300
}

fn default_tools() -> HashMap<String, ToolConfig> {
    let mut tools = HashMap::new();
    tools.insert(
        "greeter".to_string(),
        ToolConfig::Simple("builtin".to_string()),
    );
    tools.insert(
        "health_check".to_string(),
        ToolConfig::Simple("builtin".to_string()),
    );
    tools
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            health: HealthSection::default(),
            tools: default_tools(),
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.name must not be empty".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must not be 0".to_string(),
            ));
        }
        if self.health.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "health.interval_secs must not be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the configured bind address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                ConfigError::Validation(format!(
                    "invalid bind address {}:{}: {e}",
                    self.server.host, self.server.port
                ))
            })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
