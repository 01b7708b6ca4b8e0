//! Greeter tool implementation
//!
//! Greets the caller; an empty input is replaced by a default
//! encouragement line before the final message is composed. The tool
//! never fails: anything unexpected comes back as an error string result.

use crate::tools::{Tool, ToolDescription, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Substituted for an empty input before composing the final message
pub const DEFAULT_GREETING_INPUT: &str = "Congrats on your first MCP tool!";

const LOG_INPUT_LIMIT: usize = 50;

/// Greeter tool - builtin implementation
#[derive(Debug, Default)]
pub struct GreeterTool;

impl GreeterTool {
    pub fn new() -> Self {
        Self
    }

    /// Compose the greeting message (pure function)
    fn compose_greeting(input: &str) -> String {
        let mut message = format!("Hello {input}!");

        let input = if input.is_empty() {
            debug!("Empty input provided, using default message");
            DEFAULT_GREETING_INPUT
        } else {
            input
        };

        message.push(' ');
        message.push_str(input);
        message
    }

    /// Truncate the input for the start-of-call log line (pure function)
    fn truncate_for_log(input: &str) -> String {
        if input.chars().count() > LOG_INPUT_LIMIT {
            let truncated: String = input.chars().take(LOG_INPUT_LIMIT).collect();
            format!("{truncated}...")
        } else {
            input.to_string()
        }
    }
}

#[async_trait]
impl Tool for GreeterTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "greeter".to_string(),
            description: "Greet a user".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Name or message to greet"
                    }
                },
                "required": ["input"],
                "additionalProperties": false
            }),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input = parameters
            .get("input")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        info!(
            "TOOL_START | greeter | Input: {}",
            Self::truncate_for_log(input)
        );

        Ok(Value::String(Self::compose_greeting(input)))
    }
}
