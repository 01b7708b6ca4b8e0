//! Access-record noise filtering
//!
//! Monitoring probes poll `/metrics` and `/health` style paths that this
//! server does not serve, so the access log would otherwise fill with 404
//! noise. The filter decides which rendered access records reach a sink,
//! and `log_request_summary` emits lines for the requests worth keeping.

use tracing::{info, warn};

const NOISY_PATHS: [&str; 4] = ["/metrics", "/health", "/favicon.ico", "/robots.txt"];

const STARTUP_BANNERS: [&str; 3] = [
    "Started server process",
    "Waiting for application startup",
    "Application startup complete",
];

const API_PREFIX: &str = "/api/";

/// Predicate suppressing uninteresting transport log records
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseFilter;

impl NoiseFilter {
    pub fn new() -> Self {
        Self
    }

    /// Whether a rendered record should reach a sink
    ///
    /// Suppresses 404s on the well-known probe paths and framework
    /// startup banners; everything else passes through.
    pub fn admit(&self, message: &str) -> bool {
        if message.contains("404 Not Found")
            && NOISY_PATHS.iter().any(|path| message.contains(path))
        {
            return false;
        }

        if STARTUP_BANNERS
            .iter()
            .any(|phrase| message.contains(phrase))
        {
            return false;
        }

        true
    }
}

/// What `log_request_summary` does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryAction {
    /// Noisy path, never logged regardless of status
    Suppress,
    /// Failed request, logged at WARN
    Warning,
    /// Interesting request, logged at INFO
    Info,
    /// Routine request, not logged
    Ignore,
}

/// Decide how a request should be summarized (pure function)
pub fn classify(path: &str, status: u16) -> SummaryAction {
    if NOISY_PATHS.iter().any(|noisy| path.contains(noisy)) {
        return SummaryAction::Suppress;
    }
    if status >= 400 {
        return SummaryAction::Warning;
    }
    if path.starts_with(API_PREFIX) || path.to_lowercase().contains("tool") {
        return SummaryAction::Info;
    }
    SummaryAction::Ignore
}

/// Log important requests only
pub fn log_request_summary(method: &str, path: &str, status: u16, duration: f64) {
    match classify(path, status) {
        SummaryAction::Suppress | SummaryAction::Ignore => {}
        SummaryAction::Warning => warn!(
            "HTTP_ERROR | {method} {path} | Status: {status} | Duration: {duration:.3}s"
        ),
        SummaryAction::Info => info!(
            "HTTP_REQUEST | {method} {path} | Status: {status} | Duration: {duration:.3}s"
        ),
    }
}

/// Access-log entry point used by the HTTP transport
///
/// Renders the record the way an access logger would, drops it if the
/// noise filter rejects it, and otherwise hands it to the summary logger.
pub(crate) fn access_log(
    filter: &NoiseFilter,
    method: &str,
    path: &str,
    status: u16,
    reason: &str,
    duration: f64,
) {
    let rendered = format!("{method} {path} {status} {reason}");
    if !filter.admit(&rendered) {
        return;
    }
    log_request_summary(method, path, status, duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_suppresses_noisy_404() {
        let filter = NoiseFilter::new();
        assert!(!filter.admit("GET /health 404 Not Found"));
        assert!(!filter.admit("GET /metrics 404 Not Found"));
        assert!(!filter.admit("GET /favicon.ico 404 Not Found"));
        assert!(!filter.admit("GET /robots.txt 404 Not Found"));
    }

    #[test]
    fn test_admit_passes_successful_requests() {
        let filter = NoiseFilter::new();
        assert!(filter.admit("GET /api/tool 200 OK"));
        assert!(filter.admit("POST /mcp 200 OK"));
    }

    #[test]
    fn test_admit_requires_both_conditions() {
        let filter = NoiseFilter::new();
        // Noisy path without a 404 passes; a 404 on a normal path passes.
        assert!(filter.admit("GET /health 200 OK"));
        assert!(filter.admit("GET /other 404 Not Found"));
    }

    #[test]
    fn test_admit_suppresses_startup_banners() {
        let filter = NoiseFilter::new();
        assert!(!filter.admit("INFO: Started server process [123]"));
        assert!(!filter.admit("Waiting for application startup"));
        assert!(!filter.admit("Application startup complete"));
    }

    #[test]
    fn test_classify_suppresses_noisy_paths_regardless_of_status() {
        assert_eq!(classify("/metrics", 200), SummaryAction::Suppress);
        assert_eq!(classify("/metrics", 500), SummaryAction::Suppress);
        assert_eq!(classify("/health", 404), SummaryAction::Suppress);
        assert_eq!(classify("/api/health", 200), SummaryAction::Suppress);
    }

    #[test]
    fn test_classify_failed_requests_warn() {
        assert_eq!(classify("/api/do", 500), SummaryAction::Warning);
        assert_eq!(classify("/anything", 400), SummaryAction::Warning);
    }

    #[test]
    fn test_classify_interesting_requests_info() {
        assert_eq!(classify("/api/do", 200), SummaryAction::Info);
        assert_eq!(classify("/call/Tool", 200), SummaryAction::Info);
        assert_eq!(classify("/TOOLS", 201), SummaryAction::Info);
    }

    #[test]
    fn test_classify_routine_requests_ignored() {
        assert_eq!(classify("/", 200), SummaryAction::Ignore);
        assert_eq!(classify("/mcp", 200), SummaryAction::Ignore);
    }

    #[test]
    fn test_log_request_summary_paths_do_not_panic() {
        log_request_summary("GET", "/metrics", 200, 0.01);
        log_request_summary("POST", "/api/do", 500, 1.2);
        log_request_summary("POST", "/api/do", 200, 0.5);
        log_request_summary("GET", "/", 200, 0.001);
    }

    #[test]
    fn test_access_log_filters_before_summary() {
        let filter = NoiseFilter::new();
        // Suppressed by the filter before the summary logger runs.
        access_log(&filter, "GET", "/health", 404, "Not Found", 0.002);
        // Admitted and summarized at WARN.
        access_log(&filter, "POST", "/api/do", 500, "Internal Server Error", 1.2);
    }
}
