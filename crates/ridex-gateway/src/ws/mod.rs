//! Real-time dispatch relay over WebSocket.

pub mod frames;
pub mod handler;
pub mod relay;
pub mod rooms;

pub use frames::{ClientEvent, Frame};
pub use handler::WebSocketHandler;
pub use relay::{relay_event, relay_filter, spawn_relay};
pub use rooms::{ConnectionId, RoomRegistry};
