//! Kuba Sankey HTTP Server
//!
//! Serves flow graphs built from the ClickHouse flows table.
//!
//! # Endpoints
//!
//! - `POST /api/v0/console/sankey` - Build a flow graph
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//!
//! # CLI Commands
//!
//! - `start` - Start the HTTP server (default if no command specified)
//! - `check-config` - Validate configuration and print a summary
//! - `render-sql` - Print the query generated for a request file
//!
//! # Configuration
//!
//! The server reads configuration from:
//! 1. `--config` flag
//! 2. `SANKEY_CONFIG` environment variable (path to TOML file)
//! 3. `./sankey.toml` in current directory
//! 4. Default configuration

mod config;

use clap::{Parser, Subcommand};
use kuba_sankey::{
    api::{build_router, AppState},
    config::ApplicationConfig,
    service,
    store::{ClickHouseStore, QueryTemplate},
    SankeyRequest, SankeyService,
};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::signal;
use tracing::{debug, info, warn};

// =============================================================================
// CLI Definition
// =============================================================================

/// Kuba Sankey - flow-graph service for the traffic console
#[derive(Parser)]
#[command(name = "sankey-server")]
#[command(version)]
#[command(about = "Sankey flow-graph service backed by ClickHouse", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (overrides SANKEY_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override listen address (e.g., 0.0.0.0:8080)
    #[arg(short, long, global = true)]
    listen: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Start,

    /// Validate configuration file without starting the server
    CheckConfig,

    /// Print the SQL generated for a JSON request, placeholders resolved
    RenderSql {
        /// Path to a JSON sankey request
        #[arg(short, long)]
        request: PathBuf,
    },
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

/// Validate configuration and print summary
fn cmd_check_config(app_config: &ApplicationConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration is valid!");
    println!();
    println!("Server Settings:");
    println!("  Listen address: {}", app_config.server.listen_addr);
    println!("  Log level: {}", app_config.server.log_level);
    println!();
    println!("ClickHouse Settings:");
    println!("  URL: {}", app_config.clickhouse.url);
    println!("  Database: {}", app_config.clickhouse.database);
    println!("  Table: {}", app_config.clickhouse.table);
    println!("  Timeout: {}s", app_config.clickhouse.timeout_secs);
    println!();
    println!("Sankey Limits:");
    println!("  Max limit: {}", app_config.sankey.max_limit);
    println!("  Max dimensions: {}", app_config.sankey.max_dimensions);
    println!();
    println!("Effective configuration:");
    println!("{}", effective_config(app_config)?);

    Ok(())
}

/// Effective configuration as TOML, password masked
fn effective_config(app_config: &ApplicationConfig) -> kuba_sankey::Result<String> {
    let mut shown = app_config.clone();
    if shown.clickhouse.password.is_some() {
        shown.clickhouse.password = Some("********".to_string());
    }
    shown.to_toml()
}

/// Render the query for a request file without contacting the store
///
/// The request is held to the same limits as the server.
fn render_sql(
    app_config: &ApplicationConfig,
    request_path: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(request_path)?;
    let request: SankeyRequest = serde_json::from_str(&contents)?;
    let query = service::prepare(&app_config.sankey, request)?;

    let template = QueryTemplate::new(&app_config.clickhouse.table);
    let rendered = query.to_sql();
    Ok(template
        .resolve(&rendered.sql, &query.range())
        .trim_start()
        .to_string())
}

fn cmd_render_sql(
    app_config: &ApplicationConfig,
    request_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_sql(app_config, request_path)?);
    Ok(())
}

// =============================================================================
// Server
// =============================================================================

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler installation failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "SIGTERM handler installation failed");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

async fn run_server(app_config: ApplicationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&app_config.server.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("Starting Kuba Sankey Server v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Configuration: listen_addr={}, clickhouse={}, table={}",
        app_config.server.listen_addr, app_config.clickhouse.url, app_config.clickhouse.table
    );

    let store = Arc::new(ClickHouseStore::new(&app_config.clickhouse)?);
    let service = SankeyService::new(store, app_config.sankey.clone());
    let state = Arc::new(AppState { service });

    let app = build_router(state, &app_config.server.cors_allowed_origins);

    let addr: SocketAddr = app_config.server.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut app_config = config::load_config(cli.config.as_deref())?;
    if let Some(listen) = &cli.listen {
        app_config.server.listen_addr = listen.clone();
    }

    match &cli.command {
        Some(Commands::CheckConfig) => cmd_check_config(&app_config),
        Some(Commands::RenderSql { request }) => cmd_render_sql(&app_config, request),
        Some(Commands::Start) | None => run_server(app_config).await,
    }
}
