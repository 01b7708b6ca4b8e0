//! Thread-safe server statistics
//!
//! Aggregate counters shared by every tool invocation and protocol call.
//! Scalar counters are atomic; the per-method and per-tool maps sit behind
//! mutexes. Lock scope covers counter mutation only; log lines are emitted
//! after the locks are released.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

/// Tool names known at construction; unknown names are tolerated and
/// created on first use.
pub const KNOWN_TOOLS: [&str; 3] = ["greeter", "retrieve_veeva_document", "health_check"];

/// Per-tool invocation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolCallStats {
    pub calls: u64,
    pub errors: u64,
}

/// Aggregate server statistics, one shared instance per process
///
/// Explicitly constructed and injected into every component that needs it;
/// all mutation goes through the `record_*` methods.
pub struct ServerStats {
    started_at: Instant,
    start_time: SystemTime,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    protocol_calls: Mutex<HashMap<String, u64>>,
    tool_stats: Mutex<HashMap<String, ToolCallStats>>,
}

impl ServerStats {
    /// Create stats pre-populated with the known tool names
    pub fn new() -> Self {
        Self::with_tools(&KNOWN_TOOLS)
    }

    /// Create stats pre-populated with the given tool names
    pub fn with_tools(tools: &[&str]) -> Self {
        let tool_stats = tools
            .iter()
            .map(|name| (name.to_string(), ToolCallStats::default()))
            .collect();

        Self {
            started_at: Instant::now(),
            start_time: SystemTime::now(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            protocol_calls: Mutex::new(HashMap::new()),
            tool_stats: Mutex::new(tool_stats),
        }
    }

    /// Record the outcome of a single tool invocation
    ///
    /// Increments the aggregate counters and the per-tool entry (created on
    /// first use), then emits one TOOL_SUCCESS or TOOL_ERROR line.
    pub fn record_tool_call(&self, tool_name: &str, success: bool, duration: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut tools) = self.tool_stats.lock() {
            let entry = tools.entry(tool_name.to_string()).or_default();
            entry.calls += 1;
            if !success {
                entry.errors += 1;
            }
        }

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
            info!(
                "TOOL_SUCCESS | {} | Duration: {:.3}s",
                tool_name,
                duration.as_secs_f64()
            );
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
            error!(
                "TOOL_ERROR | {} | Duration: {:.3}s",
                tool_name,
                duration.as_secs_f64()
            );
        }
    }

    /// Record an incoming protocol call
    ///
    /// Counts the method (entry created on first use) and logs a line whose
    /// content depends on the method. A `tools/call` without a usable tool
    /// name degrades to the literal `"unknown"`.
    pub fn record_protocol_call(&self, method: &str, params: Option<&Value>) {
        if let Ok(mut calls) = self.protocol_calls.lock() {
            *calls.entry(method.to_string()).or_insert(0) += 1;
        }

        match method {
            "tools/list" => info!("MCP_REQUEST | tools/list | Client requesting available tools"),
            "tools/call" => {
                let tool_name = params
                    .and_then(|p| p.get("name"))
                    .and_then(|n| n.as_str())
                    .unwrap_or("unknown");
                info!("MCP_REQUEST | tools/call | Tool: {}", tool_name);
            }
            "initialize" => info!("MCP_REQUEST | initialize | Client handshake"),
            other => info!("MCP_REQUEST | {} | Protocol call", other),
        }
    }

    /// Wall-clock instant the server started
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Time elapsed since construction
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// Success percentage over all requests; 0 when nothing was recorded
    /// yet rather than dividing by zero
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests().max(1);
        self.successful_requests() as f64 / total as f64 * 100.0
    }

    /// Number of tools that have been called at least once
    pub fn active_tool_count(&self) -> usize {
        self.tool_stats
            .lock()
            .map(|tools| tools.values().filter(|stats| stats.calls > 0).count())
            .unwrap_or(0)
    }

    /// Counter for a single protocol method
    pub fn protocol_call_count(&self, method: &str) -> u64 {
        self.protocol_calls
            .lock()
            .ok()
            .and_then(|calls| calls.get(method).copied())
            .unwrap_or(0)
    }

    /// Counters for a single tool
    pub fn tool_call_stats(&self, tool_name: &str) -> Option<ToolCallStats> {
        self.tool_stats
            .lock()
            .ok()
            .and_then(|tools| tools.get(tool_name).copied())
    }

    /// Consistent point-in-time view of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let protocol_calls = self
            .protocol_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default();
        let tools = self
            .tool_stats
            .lock()
            .map(|tools| tools.clone())
            .unwrap_or_default();

        StatsSnapshot {
            uptime_seconds: self.uptime().as_secs_f64(),
            total_requests: self.total_requests(),
            successful_requests: self.successful_requests(),
            failed_requests: self.failed_requests(),
            success_rate: self.success_rate(),
            active_tool_count: tools.values().filter(|stats| stats.calls > 0).count(),
            protocol_calls,
            tools,
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the server statistics
#[derive(Debug, Serialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub active_tool_count: usize,
    pub protocol_calls: HashMap<String, u64>,
    pub tools: HashMap<String, ToolCallStats>,
}

/// Current unix timestamp in seconds
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
