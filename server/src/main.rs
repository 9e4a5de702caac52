//! Chatter Server - Main entry point.
//!
//! This binary starts the Chatter event hub with:
//! - Structured JSON logging
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! # Configuration
//!
//! See [`chatter_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! CHATTER_PORT=8563 cargo run --bin chatter-server
//!
//! curl -X POST http://127.0.0.1:8563/speak \
//!     -H 'Content-Type: application/json' \
//!     -d '{"text":"こんにちは","emotion":"happy"}'
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use chatter_server::config::Config;
use chatter_server::error::ServerError;
use chatter_server::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  CHATTER_PORT  - HTTP server port (default: 8563)");
            eprintln!("  PORT          - Fallback for CHATTER_PORT");
            eprintln!("  CHATTER_HOST  - Bind address (default: 127.0.0.1)");
            eprintln!("  RUST_LOG      - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    match run(config).await {
        Ok(()) => {
            info!("Server shutdown complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "Server error");
            ExitCode::from(1)
        }
    }
}

/// Binds the listener and serves until a shutdown signal arrives.
async fn run(config: Config) -> Result<(), ServerError> {
    let bind_addr = config.bind_address();
    info!(address = %bind_addr, "Chatter server starting");

    let app = create_router(AppState::new());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| ServerError::bind(bind_addr.clone(), err))?;

    info!(address = %bind_addr, "Server listening");
    info!("WebSocket endpoint: ws://{bind_addr}/ws");
    info!("HTTP endpoint: POST http://{bind_addr}/speak");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down gracefully");
    Ok(())
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves when SIGINT or SIGTERM is received.
///
/// A handler that cannot be installed is logged and never fires, so the
/// other signal still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
