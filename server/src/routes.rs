//! HTTP route handlers for the AlertHub server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `POST /alert` - Ingest one alert from a producer
//! - `GET /alerts` - Full alert history, oldest first
//! - `GET /ws` - WebSocket subscription endpoint for live alerts
//! - `GET /health` - Health check endpoint
//! - `GET /` - Browser dashboard
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`], which contains:
//! - Configuration
//! - The [`Broker`] holding history and subscribers
//! - Server start time for uptime reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use alerthub_server::routes::{create_router, AppState};
//! use alerthub_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let state = AppState::new(config).expect("failed to build state");
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ws::WebSocket, DefaultBodyLimit, State, WebSocketUpgrade},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, trace};

use crate::broadcast::ChannelSink;
use crate::broker::Broker;
use crate::config::Config;
use crate::error::{Result, ServerError};
use crate::types::Alert;

/// Maximum body size for alert ingestion (1 MB).
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Browser dashboard served at `/`.
const DASHBOARD_HTML: &str = include_str!("../static/index.html");

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
///
/// Cloned for each request handler; all clones share the same broker.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Alert broker: history, subscribers and escalation.
    pub broker: Arc<Broker>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker cannot be built (invalid capacity or
    /// SMS client setup failure).
    pub fn new(config: Config) -> Result<Self> {
        let broker = Broker::from_config(&config)?;
        Ok(Self::with_broker(config, broker))
    }

    /// Creates application state around an existing broker.
    ///
    /// Useful for testing with a custom escalator or capacity.
    #[must_use]
    pub fn with_broker(config: Config, broker: Broker) -> Self {
        Self {
            config: Arc::new(config),
            broker: Arc::new(broker),
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"<Config>")
            .field("broker", &self.broker)
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/alert", post(post_alert))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .route("/alerts", get(get_alerts))
        .route("/ws", get(get_ws))
        .route("/health", get(get_health))
        .route("/", get(get_index))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// POST /alert - Alert Ingestion
// ============================================================================

/// Response body for a successful ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Always `"ok"`.
    pub status: String,
}

/// POST /alert - Ingest one alert.
///
/// # Request Body
///
/// One alert as JSON. `payload` is optional; every other field is required.
///
/// # Responses
///
/// - `200 OK` - `{"status":"ok"}`; alert stored and fanned out
/// - `400 Bad Request` - Invalid JSON, missing field or wrong field type
/// - `413 Payload Too Large` - Body exceeds 1 MB
async fn post_alert(State(state): State<AppState>, body: Bytes) -> Result<Json<IngestResponse>> {
    let alert: Alert = serde_json::from_slice(&body).map_err(|err| {
        debug!(error = %err, "Failed to parse alert payload");
        ServerError::validation(format!("invalid alert format: {err}"))
    })?;

    let event_id = alert.id.clone();
    let ack = state.broker.ingest(alert).await;

    info!(
        event_id = %event_id,
        delivered = ack.delivered,
        dropped = ack.dropped,
        evicted = ack.evicted,
        "Alert accepted"
    );

    Ok(Json(IngestResponse {
        status: "ok".to_string(),
    }))
}

// ============================================================================
// GET /alerts - History
// ============================================================================

/// GET /alerts - Returns the retained alerts, oldest first.
async fn get_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    Json(state.broker.history().await)
}

// ============================================================================
// GET /ws - WebSocket Subscription
// ============================================================================

/// GET /ws - WebSocket subscription endpoint.
///
/// Once connected, the server sends every accepted alert as a JSON text
/// message. Messages from the client are read and ignored.
async fn get_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    debug!("WebSocket client connecting");

    let queue = state.config.subscriber_queue;
    ws.on_upgrade(move |socket| handle_websocket(socket, state.broker, queue))
}

/// Handles an established WebSocket connection.
///
/// Registers a [`ChannelSink`] with the broker, then runs two halves:
/// a writer task draining the sink's queue into the socket, and a reader
/// loop waiting for the client to close. Whichever ends first tears the
/// connection down; the subscriber is removed from the broker (a no-op if a
/// failed push already dropped it).
async fn handle_websocket(socket: WebSocket, broker: Arc<Broker>, queue: usize) {
    use axum::extract::ws::Message;
    use futures_util::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(queue);
    let subscriber_id = broker.subscribe(ChannelSink::new(tx));

    info!(subscriber_id = %subscriber_id, "WebSocket client connected");

    // Forward queued alerts to the client. Exiting drops `rx`, which makes
    // the next push to this subscriber fail and removes it from the set.
    let mut forward_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(err) = sender.send(Message::Text(frame.into())).await {
                debug!(error = %err, "Failed to send alert to WebSocket client");
                break;
            }
        }
    });

    // Wait for client to disconnect
    let read_loop = async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client sent close frame");
                    break;
                }
                Ok(Message::Ping(data)) => {
                    // axum handles pong automatically
                    trace!(data_len = data.len(), "Received ping");
                }
                Ok(_) => {
                    // Ignore other messages from client
                }
                Err(err) => {
                    debug!(error = %err, "WebSocket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = read_loop => {}
        _ = &mut forward_task => {
            debug!(subscriber_id = %subscriber_id, "WebSocket writer stopped");
        }
    }

    forward_task.abort();
    broker.unsubscribe(subscriber_id);
    info!(subscriber_id = %subscriber_id, "WebSocket client disconnected");
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of live WebSocket subscribers.
    pub subscribers: usize,

    /// Number of alerts currently retained.
    pub alerts: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed();

    Json(HealthResponse {
        status: "ok".to_string(),
        subscribers: state.broker.subscriber_count(),
        alerts: state.broker.history_len().await,
        uptime_seconds: uptime.as_secs(),
    })
}

// ============================================================================
// GET / - Dashboard
// ============================================================================

async fn get_index() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

// ============================================================================
// Tests
// ============================================================================
