//! Periodic health reporting and the on-demand health snapshot
//!
//! A background task reads `ServerStats` on a timer and logs a health
//! block; the `health_check` function produces the JSON snapshot served by
//! the registered health tool. Neither path ever mutates the stats.

use crate::observability::stats::{current_timestamp, ServerStats};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// JSON shape returned by the health tool
#[derive(Debug, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub uptime_seconds: f64,
    pub total_requests: u64,
    pub success_rate: f64,
    pub timestamp: u64,
}

/// Emit one multi-line health block derived from the stats
///
/// Read-only apart from the log side effect.
pub fn report_health(stats: &ServerStats) {
    info!(
        "HEALTH_CHECK\n   Uptime: {:.1}s\n   Total Requests: {}\n   Success Rate: {:.1}%\n   Active Tools: {}",
        stats.uptime().as_secs_f64(),
        stats.total_requests(),
        stats.success_rate(),
        stats.active_tool_count()
    );
}

/// Build the on-demand health snapshot as JSON text
///
/// Never fails toward the caller: an internal problem yields an
/// `unhealthy` payload with the error message instead.
pub fn health_check(stats: &ServerStats) -> String {
    let snapshot = HealthSnapshot {
        status: "healthy",
        uptime_seconds: round2(stats.uptime().as_secs_f64()),
        total_requests: stats.total_requests(),
        success_rate: round2(stats.success_rate()),
        timestamp: current_timestamp(),
    };

    match serde_json::to_string(&snapshot) {
        Ok(body) => body,
        Err(e) => {
            error!("Health check failed: {}", e);
            unhealthy_payload(&e.to_string())
        }
    }
}

fn unhealthy_payload(message: &str) -> String {
    serde_json::to_string(&serde_json::json!({
        "status": "unhealthy",
        "error": message,
    }))
    .unwrap_or_else(|_| r#"{"status":"unhealthy"}"#.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Timer-driven health reporting task
///
/// First report fires after `initial_delay`, then every `interval` until
/// the shutdown signal flips. The task never blocks the serving path and
/// may be abandoned at process exit.
pub struct HealthReporter {
    stats: Arc<ServerStats>,
    initial_delay: Duration,
    interval: Duration,
}

impl HealthReporter {
    pub fn new(stats: Arc<ServerStats>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            stats,
            initial_delay,
            interval,
        }
    }

    /// Spawn the reporting loop on the runtime
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut delay = self.initial_delay;
            loop {
                tokio::select! {
                    _ = sleep(delay) => {
                        report_health(&self.stats);
                        delay = self.interval;
                    }
                    _ = shutdown.changed() => {
                        debug!("Health reporter stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_health_check_healthy_shape() {
        let stats = ServerStats::new();
        let body = health_check(&stats);
        let parsed: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(parsed["status"], "healthy");
        assert_eq!(parsed["total_requests"], 0);
        assert_eq!(parsed["success_rate"], 0.0);
        assert!(parsed["timestamp"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_health_check_success_rate() {
        let stats = ServerStats::new();
        for _ in 0..7 {
            stats.record_tool_call("x", true, Duration::ZERO);
        }
        for _ in 0..3 {
            stats.record_tool_call("x", false, Duration::ZERO);
        }

        let parsed: Value = serde_json::from_str(&health_check(&stats)).unwrap();
        assert_eq!(parsed["success_rate"], 70.0);
        assert_eq!(parsed["total_requests"], 10);
    }

    #[test]
    fn test_report_health_without_requests_does_not_fault() {
        // success_rate must be 0 with no requests, never a division fault
        let stats = ServerStats::new();
        report_health(&stats);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_report_health_never_mutates_stats() {
        let stats = ServerStats::new();
        stats.record_tool_call("greeter", true, Duration::ZERO);

        report_health(&stats);

        assert_eq!(stats.total_requests(), 1);
        assert_eq!(stats.successful_requests(), 1);
        assert_eq!(stats.active_tool_count(), 1);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(70.0), 70.0);
        assert_eq!(round2(33.333_333), 33.33);
        assert_eq!(round2(66.666_666), 66.67);
    }

    #[test]
    fn test_unhealthy_payload_shape() {
        let parsed: Value = serde_json::from_str(&unhealthy_payload("boom")).unwrap();
        assert_eq!(parsed["status"], "unhealthy");
        assert_eq!(parsed["error"], "boom");
    }

    #[tokio::test]
    async fn test_reporter_stops_on_shutdown() {
        let stats = Arc::new(ServerStats::new());
        let reporter = HealthReporter::new(
            Arc::clone(&stats),
            Duration::from_secs(60),
            Duration::from_secs(300),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = reporter.spawn(shutdown_rx);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_reporter_loops_through_reports_until_shutdown() {
        let stats = Arc::new(ServerStats::new());
        let reporter = HealthReporter::new(
            Arc::clone(&stats),
            Duration::from_millis(5),
            Duration::from_millis(5),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = reporter.spawn(shutdown_rx);

        // Let several report ticks elapse; the report itself only logs,
        // so surviving the ticks and honoring shutdown is the observable
        // behavior.
        sleep(Duration::from_millis(30)).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
