//! Tool system for the MCP server
//!
//! Trait-based tool interface with a registry keyed by tool name. Call
//! arguments are validated against each tool's declared JSON schema before
//! execution.

use crate::config::ToolConfig;
use crate::observability::stats::ServerStats;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod builtin;

/// Remote-callable tool interface
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name, description, and JSON Schema for its input
    fn describe(&self) -> ToolDescription;

    /// Receives the configuration table from the `[tools]` config section;
    /// called once at server startup
    async fn initialize(&mut self, config: Option<&Value>) -> Result<(), ToolError> {
        let _ = config;
        Ok(())
    }

    /// Executes with parameters already validated against the schema from
    /// `describe()`
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;

    /// Performs cleanup at server shutdown
    async fn shutdown(&mut self) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Tool description advertised through `tools/list`
#[derive(Debug, Clone)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry managing and executing the configured tools
pub struct ToolSystem {
    stats: Arc<ServerStats>,
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolSystem {
    pub fn new(stats: Arc<ServerStats>) -> Self {
        Self {
            stats,
            tools: HashMap::new(),
        }
    }

    /// Initialize the tool system from the `[tools]` configuration table
    pub async fn initialize(
        &mut self,
        tool_configs: &HashMap<String, ToolConfig>,
    ) -> Result<(), ToolError> {
        for (tool_name, tool_config) in tool_configs {
            let mut tool = self.create_tool(tool_name, tool_config)?;

            let config = match tool_config {
                ToolConfig::Simple(_) => None,
                ToolConfig::Complex { config, .. } => Some(
                    serde_json::to_value(config)
                        .map_err(|e| ToolError::InitializationError(e.to_string()))?,
                ),
            };

            tool.initialize(config.as_ref()).await?;

            self.tools.insert(tool_name.clone(), tool);
        }

        Ok(())
    }

    /// Create tool instance based on configuration
    fn create_tool(
        &self,
        tool_name: &str,
        config: &ToolConfig,
    ) -> Result<Box<dyn Tool>, ToolError> {
        let impl_name = match config {
            ToolConfig::Simple(impl_name) => impl_name,
            ToolConfig::Complex { implementation, .. } => implementation,
        };

        match impl_name.as_str() {
            "builtin" => self.create_builtin_tool(tool_name),
            _ => Err(ToolError::UnknownImplementation(impl_name.clone())),
        }
    }

    /// Create builtin tool instances
    fn create_builtin_tool(&self, tool_name: &str) -> Result<Box<dyn Tool>, ToolError> {
        match tool_name {
            "greeter" => Ok(Box::new(builtin::GreeterTool::new())),
            "health_check" => Ok(Box::new(builtin::HealthCheckTool::new(Arc::clone(
                &self.stats,
            )))),
            _ => Err(ToolError::UnknownTool(tool_name.to_string())),
        }
    }

    /// Whether a tool is registered under this name
    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    /// Get tool description
    pub fn describe_tool(&self, tool_name: &str) -> Option<ToolDescription> {
        self.tools.get(tool_name).map(|tool| tool.describe())
    }

    /// Descriptions of every registered tool
    pub fn descriptions(&self) -> Vec<ToolDescription> {
        self.tools.values().map(|tool| tool.describe()).collect()
    }

    /// Execute tool with validated parameters
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        parameters: &Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        // Parameters are validated against the declared schema before the
        // tool ever sees them.
        self.validate_parameters(tool_name, parameters)?;

        tool.execute(parameters).await
    }

    /// Validate parameters against the tool's declared schema
    fn validate_parameters(&self, tool_name: &str, parameters: &Value) -> Result<(), ToolError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        let description = tool.describe();
        let validator = jsonschema::validator_for(&description.parameters)
            .map_err(|e| ToolError::SchemaError(format!("Schema compilation error: {e}")))?;

        validator.validate(parameters).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            ToolError::ValidationError(error_messages.join("; "))
        })
    }

    /// Get list of registered tool names
    pub fn list_tools(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Shutdown all tools
    pub async fn shutdown(&mut self) -> Result<(), ToolError> {
        for tool in self.tools.values_mut() {
            tool.shutdown().await?;
        }
        Ok(())
    }
}

/// Tool system errors
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Unknown tool implementation: {0}")]
    UnknownImplementation(String),
    #[error("Tool initialization failed: {0}")]
    InitializationError(String),
    #[error("Parameter validation failed: {0}")]
    ValidationError(String),
    #[error("Schema error: {0}")]
    SchemaError(String),
    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
    #[error("Tool shutdown failed: {0}")]
    ShutdownError(String),
}
