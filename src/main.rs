//! Vault Clinical MCP Server - Main Entry Point
//!
//! Starts the MCP server over HTTP with structured logging, periodic
//! health reporting, and signal-driven graceful shutdown.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use vault_mcp::config::{ConfigError, ServerConfig};
use vault_mcp::error::ServerError;
use vault_mcp::observability::health::HealthReporter;
use vault_mcp::observability::logging::{
    init_logging, log_server_ready, log_server_shutdown, log_server_startup, LogConfig,
};
use vault_mcp::observability::stats::ServerStats;
use vault_mcp::tools::ToolSystem;
use vault_mcp::transport;
use vault_mcp::McpServer;

/// Vault Clinical MCP Server
#[derive(Parser)]
#[command(name = "vault-mcp")]
#[command(about = "Clinical document MCP server")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging must come up before anything else; a failure here is fatal
    // and can only be reported on stderr.
    if let Err(e) = init_logging(&LogConfig::from_env()) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    info!("Starting Vault Clinical MCP Server v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_server(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: &Option<PathBuf>) -> Result<ServerConfig, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            ServerConfig::load_from_file(path)
        }
        None => {
            // Try default locations, then fall back to built-in defaults
            for path_str in ["vault-mcp.toml", "config/vault-mcp.toml"] {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return ServerConfig::load_from_file(&path);
                }
            }
            info!("No configuration file found, using defaults");
            Ok(ServerConfig::default())
        }
    }
}

async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    log_server_startup(&config);

    let stats = Arc::new(ServerStats::new());

    let mut tools = ToolSystem::new(Arc::clone(&stats));
    tools.initialize(&config.tools).await?;

    let server = Arc::new(McpServer::new(
        &config.server.name,
        tools,
        Arc::clone(&stats),
    ));
    let addr = config.bind_addr()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic health reporting runs on its own task and never blocks the
    // serving path.
    let reporter = HealthReporter::new(
        Arc::clone(&stats),
        Duration::from_secs(config.health.initial_delay_secs),
        Duration::from_secs(config.health.interval_secs),
    );
    let health_task = reporter.spawn(shutdown_rx.clone());

    log_server_ready(&server.tool_names());

    let mut transport_task = tokio::spawn(transport::serve(
        Arc::clone(&server),
        addr,
        shutdown_rx.clone(),
    ));

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .map_err(|e| ServerError::setup(format!("cannot install SIGINT handler: {e}")))?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .map_err(|e| ServerError::setup(format!("cannot install SIGTERM handler: {e}")))?;

    info!("MCP server running, waiting for requests");

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        result = &mut transport_task => {
            // The transport only ends on its own when startup failed.
            let _ = shutdown_tx.send(true);
            let _ = health_task.await;
            return flatten_transport_result(result);
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = flatten_transport_result(transport_task.await);
    let _ = health_task.await;

    log_server_shutdown();
    Ok(())
}

fn flatten_transport_result(
    result: Result<Result<(), ServerError>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(ServerError::transport(format!("transport task failed: {e}"))),
    }
}

fn handle_config_command(config: &ServerConfig, show: bool) -> Result<(), ServerError> {
    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| ServerError::setup(format!("cannot render configuration: {e}")))?;
        println!("Current configuration:");
        println!("{rendered}");
    }

    info!("Configuration validation complete");
    Ok(())
}
