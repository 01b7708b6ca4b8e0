//! Observability subsystem
//!
//! Structured logging with dual sinks, aggregate server statistics, and
//! timer-driven health reporting.

pub mod health;
pub mod logging;
pub mod stats;

// Re-export for convenience
pub use health::{health_check, report_health, HealthReporter, HealthSnapshot};
pub use logging::{init_logging, parse_level, LogConfig};
pub use stats::{ServerStats, StatsSnapshot, ToolCallStats};
