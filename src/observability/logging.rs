//! Structured logging with dual sinks
//!
//! Installs a process-wide tracing subscriber with two sinks sharing one
//! line format: the process stderr stream (safe even when a hosting MCP
//! transport owns stdout) and a size-rotating log file. Installation is
//! idempotent; repeated calls never attach duplicate sinks.
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: minimum severity (DEBUG, INFO, WARNING, ERROR, CRITICAL;
//!   the tracing spellings WARN and TRACE are also accepted) - defaults to INFO
//! - `LOG_DIR`: log directory - defaults to `/tmp/vault-mcp/logs`
//! - `RUST_LOG`: override log filtering (follows env_logger format)

use crate::config::ServerConfig;
use crate::error::ServerError;
use once_cell::sync::Lazy;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::{info, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Default log directory when `LOG_DIR` is unset
pub const DEFAULT_LOG_DIR: &str = "/tmp/vault-mcp/logs";

/// Log file name within the log directory
pub const LOG_FILE_NAME: &str = "server.log";

const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_BACKUPS: usize = 3;

/// Minimum severity, read once from `LOG_LEVEL` at module initialization
pub static LOG_LEVEL: Lazy<Level> =
    Lazy::new(|| parse_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string())));

static INIT: Once = Once::new();
static SINKS: AtomicUsize = AtomicUsize::new(0);

/// Parse a severity name, accepting both the Python-style and tracing
/// spellings; unknown values default to INFO
pub fn parse_level(value: &str) -> Level {
    match value.trim().to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARNING" | "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        "CRITICAL" | "FATAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// File sink configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file_name: String,
    pub max_bytes: u64,
    pub max_backups: usize,
}

impl LogConfig {
    /// Build configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            dir: env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR)),
            ..Self::default()
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: LOG_FILE_NAME.to_string(),
            max_bytes: MAX_LOG_BYTES,
            max_backups: MAX_LOG_BACKUPS,
        }
    }
}

/// Initialize the logging subsystem
///
/// Creates the log directory (tolerant of it already existing) and installs
/// the subscriber under a one-time guard. Directory-creation failure is
/// fatal to setup and propagates to the caller. Calling this more than once
/// is a no-op: the process ends up with exactly one stderr sink and one
/// file sink.
pub fn init_logging(config: &LogConfig) -> Result<(), ServerError> {
    fs::create_dir_all(&config.dir).map_err(|e| {
        ServerError::setup(format!(
            "cannot create log directory {}: {e}",
            config.dir.display()
        ))
    })?;

    let mut install_error = None;
    INIT.call_once(|| {
        if let Err(e) = install_subscriber(config) {
            install_error = Some(e);
        }
    });

    match install_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Number of sinks attached to the process-wide logger
pub fn sink_count() -> usize {
    SINKS.load(Ordering::Relaxed)
}

fn install_subscriber(config: &LogConfig) -> Result<(), ServerError> {
    let file_writer = RollingWriter::open(
        config.dir.join(&config.file_name),
        config.max_bytes,
        config.max_backups,
    )
    .map_err(|e| ServerError::setup(format!("cannot open log file: {e}")))?;

    let mut filter = EnvFilter::new(LOG_LEVEL.to_string())
        // Reduce noise from the HTTP transport stack
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("warp=warn".parse().unwrap());

    // Allow RUST_LOG to override
    if let Ok(rust_log) = env::var("RUST_LOG") {
        filter = EnvFilter::new(rust_log);
    }

    let stderr_layer = fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(io::stderr);
    let file_layer = fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ServerError::setup(format!("cannot install tracing subscriber: {e}")))?;

    SINKS.store(2, Ordering::Relaxed);
    Ok(())
}

/// Shared line format: `[timestamp] LEVEL | target | message`
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "[{}] {:<8} | {} | ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            meta.level(),
            meta.target()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Size-bounded rotating file writer
///
/// When a write would push the live file past `max_bytes`, the file is
/// rotated to `.1` and existing backups shift up, keeping at most
/// `max_backups` of them.
#[derive(Clone)]
pub struct RollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

struct RollingFile {
    path: PathBuf,
    max_bytes: u64,
    max_backups: usize,
    file: File,
    written: u64,
}

impl RollingWriter {
    /// Open (or create) the log file, appending to any existing content
    pub fn open(
        path: PathBuf,
        max_bytes: u64,
        max_backups: usize,
    ) -> io::Result<Self> {
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            inner: Arc::new(Mutex::new(RollingFile {
                path,
                max_bytes,
                max_backups,
                file,
                written,
            })),
        })
    }
}

impl io::Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        if inner.written + buf.len() as u64 > inner.max_bytes {
            inner.rotate()?;
        }
        let n = inner.file.write(buf)?;
        inner.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        inner.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl RollingFile {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_backups == 0 {
            fs::remove_file(&self.path)?;
        } else {
            // Shift existing backups up, dropping the oldest
            for i in (1..self.max_backups).rev() {
                let from = backup_path(&self.path, i);
                if from.exists() {
                    fs::rename(&from, backup_path(&self.path, i + 1))?;
                }
            }
            fs::rename(&self.path, backup_path(&self.path, 1))?;
        }

        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    PathBuf::from(format!("{}.{index}", path.display()))
}

/// Log server startup information
pub fn log_server_startup(config: &ServerConfig) {
    let banner = "=".repeat(80);
    info!("{}", banner);
    info!("{} STARTING", config.server.name.to_uppercase());
    info!("{}", banner);
    info!("Server Host: {}", config.server.host);
    info!("Server Port: {}", config.server.port);
    info!("Log Level: {}", *LOG_LEVEL);
    info!("Process ID: {}", std::process::id());
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Start Time: {}", chrono::Local::now().to_rfc3339());
    info!("{}", banner);
}

/// Log when the server is ready to accept connections
pub fn log_server_ready(tool_names: &[String]) {
    info!("Server ready, accepting connections");
    info!("Available tools: {}", tool_names.join(", "));
}

/// Log server shutdown
pub fn log_server_shutdown() {
    info!("Server shutting down");
    info!("Shutdown Time: {}", chrono::Local::now().to_rfc3339());
}
