//! HTTP route handlers for the Chatter server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `POST /speak` - Accept a speak event from a monitor or script
//! - `GET /ws` - WebSocket endpoint for avatar clients
//! - `GET /health` - Health check endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use chatter_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = create_router(AppState::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8563").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        DefaultBodyLimit, State, WebSocketUpgrade,
    },
    http::Method,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, trace, warn};

use crate::broadcast::EventBroadcaster;
use crate::error::ServerError;
use crate::types::{SpeakEvent, SpeakRequest};

/// Maximum body size for speak requests (64 KB).
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Number of characters of the text included in logs.
const LOG_PREVIEW_CHARS: usize = 50;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Fan-out hub for speak events.
    pub broadcaster: EventBroadcaster,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_broadcaster(EventBroadcaster::new())
    }

    /// Creates application state around an existing broadcaster.
    #[must_use]
    pub fn with_broadcaster(broadcaster: EventBroadcaster) -> Self {
        Self {
            broadcaster,
            start_time: Instant::now(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes and layers configured.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/speak", post(post_speak))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .route("/ws", get(get_ws))
        .route("/health", get(get_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// POST /speak
// ============================================================================

/// Body of a successful `POST /speak`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub success: bool,
}

/// Decodes a speak request from raw JSON.
///
/// Valid JSON that is not an object is treated as a request without text.
fn decode_request(body: &[u8]) -> Result<SpeakRequest, ServerError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ServerError::validation("invalid JSON"))?;

    if !value.is_object() {
        return Ok(SpeakRequest::default());
    }

    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// POST /speak - Broadcast one speak event to every client.
///
/// # Request Body
///
/// `{"text": "...", "emotion": "happy"}`; `emotion` is optional and unknown
/// labels fall back to `neutral`.
///
/// # Responses
///
/// - `200 OK` - `{"success":true}`
/// - `400 Bad Request` - `{"error":"invalid JSON"}` or `{"error":"text is required"}`
async fn post_speak(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SpeakResponse>, ServerError> {
    let event = decode_request(&body)?
        .into_event()
        .ok_or_else(|| ServerError::validation("text is required"))?;

    let preview: String = event.text.chars().take(LOG_PREVIEW_CHARS).collect();
    let receivers = state.broadcaster.broadcast(event.clone());
    info!(
        emotion = %event.emotion,
        text = %preview,
        receivers,
        "Speak event accepted"
    );

    Ok(Json(SpeakResponse { success: true }))
}

// ============================================================================
// GET /ws - WebSocket
// ============================================================================

/// GET /ws - WebSocket endpoint.
///
/// Every broadcast speak event is sent to the client as a JSON text frame.
/// Text frames from the client that decode to a speak request with usable
/// text are broadcast to all clients, the sender included.
async fn get_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    debug!("WebSocket client connecting");
    ws.on_upgrade(move |socket| handle_websocket(socket, state.broadcaster))
}

/// Handles an established WebSocket connection.
async fn handle_websocket(socket: WebSocket, broadcaster: EventBroadcaster) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = broadcaster.subscribe();

    info!(
        connections = broadcaster.subscriber_count(),
        "WebSocket client connected"
    );

    let forward_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            error!(error = %err, "Failed to serialize event");
                            continue;
                        }
                    };
                    if let Err(err) = sender.send(Message::Text(json.into())).await {
                        debug!(error = %err, "Failed to send event to WebSocket client");
                        break;
                    }
                }
                Err(RecvError::Lagged(count)) => {
                    warn!(skipped = count, "WebSocket client lagged, skipped events");
                }
                Err(RecvError::Closed) => {
                    debug!("Event broadcaster closed");
                    break;
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Some(event) = decode_client_message(text.as_str()) {
                    trace!(emotion = %event.emotion, "Relaying speak event from WebSocket client");
                    broadcaster.broadcast(event);
                }
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket client sent close frame");
                break;
            }
            Ok(Message::Ping(data)) => {
                // axum answers pings automatically
                trace!(data_len = data.len(), "Received ping");
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "WebSocket error");
                break;
            }
        }
    }

    forward_task.abort();
    info!("WebSocket client disconnected");
}

/// Turns a client text frame into a speak event, if it carries usable text.
fn decode_client_message(text: &str) -> Option<SpeakEvent> {
    match decode_request(text.as_bytes()) {
        Ok(request) => request.into_event(),
        Err(_) => {
            warn!("Invalid message received from WebSocket client");
            None
        }
    }
}

// ============================================================================
// GET /health
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of active WebSocket connections.
    pub connections: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.broadcaster.subscriber_count(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
