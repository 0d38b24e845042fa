//! Liveness, metrics and the WebSocket upgrade.

use crate::domain::error::{ApiError, ApiResult};
use crate::service::AppState;
use crate::ws::WebSocketHandler;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::error;

pub async fn root() -> &'static str {
    "RideX API is running"
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ridex-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.rooms.connection_count(),
        "rooms": state.rooms.room_count(),
    }))
}

pub async fn metrics() -> ApiResult<Response> {
    let body = ridex_telemetry::encode_metrics().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        ApiError::internal("Failed to encode metrics")
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

pub async fn socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let config = state.websocket.as_ref().clone();
    let rooms = Arc::clone(&state.rooms);
    // Oversized frames get an error reply, so the transport allows some
    // headroom above the relay limit.
    ws.max_message_size(config.max_frame_bytes.saturating_mul(4))
        .on_upgrade(move |socket| WebSocketHandler::new(rooms, config).handle(socket))
}
