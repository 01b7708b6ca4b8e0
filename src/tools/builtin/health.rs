//! Health check tool implementation
//!
//! On-demand health endpoint for monitoring systems, registered as a
//! regular tool. Always answers; internal problems come back as an
//! `unhealthy` JSON payload, never as a tool fault.

use crate::observability::health::health_check;
use crate::observability::stats::ServerStats;
use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Health check tool - builtin implementation
pub struct HealthCheckTool {
    stats: Arc<ServerStats>,
}

impl HealthCheckTool {
    pub fn new(stats: Arc<ServerStats>) -> Self {
        Self { stats }
    }
}

#[async_trait]
impl Tool for HealthCheckTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "health_check".to_string(),
            description: "Health check endpoint for monitoring systems".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, _parameters: &Value) -> Result<Value, ToolError> {
        info!("Health check tool invoked");
        Ok(Value::String(health_check(&self.stats)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_returns_healthy_json() {
        let tool = HealthCheckTool::new(Arc::new(ServerStats::new()));
        let result = tool.execute(&json!({})).await.unwrap();

        let parsed: Value = serde_json::from_str(result.as_str().unwrap()).unwrap();
        assert_eq!(parsed["status"], "healthy");
    }

    #[tokio::test]
    async fn test_execute_reflects_recorded_stats() {
        let stats = Arc::new(ServerStats::new());
        for _ in 0..7 {
            stats.record_tool_call("x", true, Duration::ZERO);
        }
        for _ in 0..3 {
            stats.record_tool_call("x", false, Duration::ZERO);
        }

        let tool = HealthCheckTool::new(Arc::clone(&stats));
        let result = tool.execute(&json!({})).await.unwrap();
        let parsed: Value = serde_json::from_str(result.as_str().unwrap()).unwrap();

        assert_eq!(parsed["total_requests"], 10);
        assert_eq!(parsed["success_rate"], 70.0);
    }

    #[test]
    fn test_describe_accepts_no_arguments() {
        let tool = HealthCheckTool::new(Arc::new(ServerStats::new()));
        let description = tool.describe();
        assert_eq!(description.name, "health_check");
        assert_eq!(description.parameters["additionalProperties"], false);
    }
}
