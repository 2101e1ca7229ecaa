//! AlertHub Server - Main entry point.
//!
//! This binary starts the AlertHub server with:
//! - Structured JSON logging for production
//! - Graceful shutdown handling (SIGTERM/SIGINT)
//!
//! # Configuration
//!
//! See [`alerthub_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Local development, no SMS escalation
//! cargo run --bin alerthub-server
//!
//! # With SMS escalation
//! TWILIO_ACCOUNT_SID=AC... \
//! TWILIO_AUTH_TOKEN=... \
//! TWILIO_FROM=+15550001 \
//! TWILIO_TO=+15550002 \
//! PORT=8000 \
//! cargo run --release --bin alerthub-server
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use alerthub_server::config::Config;
use alerthub_server::routes::{create_router, AppState};

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
            eprintln!("  PORT                      - HTTP server port (default: 8000)");
            eprintln!("  ALERTHUB_BIND_ADDR        - Listen address (default: 0.0.0.0)");
            eprintln!("  ALERTHUB_MAX_ALERTS       - History capacity (default: 200)");
            eprintln!("  ALERTHUB_SUBSCRIBER_QUEUE - Per-client queue size (default: 64)");
            eprintln!("  TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN,");
            eprintln!("  TWILIO_FROM, TWILIO_TO    - SMS escalation (all four required)");
            eprintln!("  RUST_LOG                  - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    info!(
        port = config.port,
        max_alerts = config.max_alerts,
        subscriber_queue = config.subscriber_queue,
        "AlertHub server starting"
    );
    if config.sms.is_none() {
        warn!("TWILIO_* not fully configured, SMS escalation disabled");
    }

    let listen_addr = config.listen_addr();
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(err) => {
            error!(error = %err, "Failed to initialize server state");
            return ExitCode::from(1);
        }
    };

    let app = create_router(state);

    let listener = match TcpListener::bind(&listen_addr).await {
        Ok(listener) => {
            info!(address = %listen_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(
                error = %err,
                address = %listen_addr,
                "Failed to bind to address"
            );
            return ExitCode::from(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` with a default of `info` plus request
/// tracing from tower-http.
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

/// Resolves when SIGTERM or SIGINT is received.
///
/// If a handler cannot be installed the corresponding branch never fires;
/// the other signal still triggers shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
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
                error!(error = %err, "Failed to install SIGTERM handler");
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
