//! WebSocket connection handler.
//!
//! Security features:
//! - Frame size limit (answered with an `error` frame, connection kept)
//! - Per-connection frame rate limit
//! - Idle timeout
//!
//! Every outbound frame, including replies to this socket, goes through the
//! socket's queue in the room registry, so a single task owns the sink.

use crate::domain::config::WebSocketConfig;
use crate::ws::frames::{ClientEvent, Frame, RIDE_ACCEPTED, RIDE_AVAILABLE};
use crate::ws::rooms::{driver_room, driver_type_room, rider_room, ConnectionId, RoomRegistry};
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use ridex_telemetry::WS_CONNECTIONS;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// WebSocket connection handler
pub struct WebSocketHandler {
    rooms: Arc<RoomRegistry>,
    config: WebSocketConfig,
    /// Frame counter for rate limiting
    frame_count: u32,
    /// Rate limit window start
    rate_limit_window: Instant,
}

impl WebSocketHandler {
    pub fn new(rooms: Arc<RoomRegistry>, config: WebSocketConfig) -> Self {
        Self {
            rooms,
            config,
            frame_count: 0,
            rate_limit_window: Instant::now(),
        }
    }

    /// Check rate limit, returns true if the frame is allowed
    fn check_rate_limit(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.rate_limit_window) >= Duration::from_secs(1) {
            self.rate_limit_window = now;
            self.frame_count = 0;
        }

        self.frame_count += 1;
        self.frame_count <= self.config.frames_per_second
    }

    /// Screen and apply one inbound text frame. Returns the error frame to
    /// send back, if any.
    pub fn process_text(&mut self, id: ConnectionId, text: &str) -> Option<Frame> {
        if text.len() > self.config.max_frame_bytes {
            warn!(
                connection = %id,
                size = text.len(),
                max = self.config.max_frame_bytes,
                "Frame exceeds size limit"
            );
            return Some(Frame::error(format!(
                "Frame too large: {} bytes (max: {})",
                text.len(),
                self.config.max_frame_bytes
            )));
        }

        if !self.check_rate_limit() {
            return Some(Frame::error("Rate limit exceeded"));
        }

        match ClientEvent::parse(text) {
            Ok(event) => {
                self.apply(id, event);
                None
            }
            Err(message) => {
                debug!(connection = %id, %message, "Rejected frame");
                Some(Frame::error(message))
            }
        }
    }

    fn apply(&self, id: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::DriverOnline(p) => {
                self.rooms.join(id, &driver_room(&p.driver_id));
                self.rooms.join(id, &driver_type_room(p.vehicle_type.as_str()));
                info!(connection = %id, driver_id = %p.driver_id, vehicle_type = %p.vehicle_type, "Driver online");
            }
            ClientEvent::DriverOffline(p) => {
                self.rooms.leave(id, &driver_room(&p.driver_id));
                self.rooms.leave(id, &driver_type_room(p.vehicle_type.as_str()));
                info!(connection = %id, driver_id = %p.driver_id, "Driver offline");
            }
            ClientEvent::RiderOnline(p) => {
                self.rooms.join(id, &rider_room(&p.rider_id));
                debug!(connection = %id, rider_id = %p.rider_id, "Rider online");
            }
            ClientEvent::RiderOffline(p) => {
                self.rooms.leave(id, &rider_room(&p.rider_id));
            }
            ClientEvent::RideRequest {
                vehicle_type,
                payload,
            } => {
                let room = driver_type_room(vehicle_type.as_str());
                self.rooms.emit(&room, &Frame::new(RIDE_AVAILABLE, payload));
            }
            ClientEvent::RideAccepted { rider_id, payload } => {
                self.rooms
                    .emit(&rider_room(&rider_id), &Frame::new(RIDE_ACCEPTED, payload));
            }
        }
    }

    /// Drive a connection until the client leaves or goes idle.
    pub async fn handle(mut self, socket: WebSocket) {
        let (id, mut outbound) = self.rooms.connect();
        WS_CONNECTIONS.inc();
        info!(connection = %id, "New WebSocket connection");

        let (mut sink, mut stream) = socket.split();

        let writer = tokio::spawn(async move {
            while let Some(text) = outbound.recv().await {
                if let Err(e) = sink.send(Message::Text(text.to_string())).await {
                    debug!(connection = %id, error = %e, "Socket write failed");
                    break;
                }
            }
        });

        let idle_timeout = self.config.idle_timeout();
        loop {
            let next = match tokio::time::timeout(idle_timeout, stream.next()).await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(_) => {
                    info!(connection = %id, "Closing idle WebSocket connection");
                    break;
                }
            };

            let reply = match next {
                Ok(Message::Text(text)) => self.process_text(id, &text),
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => self.process_text(id, &text),
                    Err(_) => Some(Frame::error("Binary frames must be UTF-8 JSON")),
                },
                Ok(Message::Close(_)) => break,
                // axum answers pings itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
                Err(e) => {
                    debug!(connection = %id, error = %e, "WebSocket receive error");
                    break;
                }
            };

            if let Some(frame) = reply {
                self.rooms.send_to(id, &frame);
            }
        }

        // Dropping the registry entry closes the queue, which ends the writer.
        self.rooms.disconnect(id);
        if let Err(e) = writer.await {
            debug!(connection = %id, error = %e, "Writer task ended abnormally");
        }
        WS_CONNECTIONS.dec();
        info!(connection = %id, "WebSocket connection closed");
    }
}
