//! Room registry for the dispatch relay.
//!
//! A room is a named set of sockets. Each socket owns a bounded outbound
//! queue; a broadcast never waits on a slow socket. When the queue is full
//! the frame is dropped for that socket only.
//!
//! Membership changes apply before the call returns, so a socket that has
//! joined a room sees every broadcast emitted to it afterwards.

use crate::ws::frames::Frame;
use dashmap::DashMap;
use ridex_telemetry::{WS_FRAMES_DROPPED, WS_FRAMES_RELAYED};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Identifier of one WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

pub fn driver_room(driver_id: &str) -> String {
    format!("driver:{driver_id}")
}

pub fn driver_type_room(vehicle_type: &str) -> String {
    format!("driver-type:{vehicle_type}")
}

pub fn rider_room(rider_id: &str) -> String {
    format!("rider:{rider_id}")
}

struct Connection {
    sender: mpsc::Sender<Arc<str>>,
    rooms: HashSet<String>,
}

/// Process-wide room membership. Lives only in memory.
pub struct RoomRegistry {
    rooms: DashMap<String, HashSet<ConnectionId>>,
    connections: DashMap<ConnectionId, Connection>,
    next_id: AtomicU64,
    queue_size: usize,
}

impl RoomRegistry {
    pub fn new(queue_size: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_size: queue_size.max(1),
        }
    }

    /// Register a socket. The receiver yields serialized frames for it.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<Arc<str>>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.queue_size);
        self.connections.insert(
            id,
            Connection {
                sender,
                rooms: HashSet::new(),
            },
        );
        debug!(connection = %id, "Socket registered");
        (id, receiver)
    }

    /// Remove a socket and every membership it holds.
    pub fn disconnect(&self, id: ConnectionId) {
        let Some((_, connection)) = self.connections.remove(&id) else {
            return;
        };
        for room in &connection.rooms {
            self.drop_member(room, id);
        }
        debug!(connection = %id, rooms = connection.rooms.len(), "Socket removed");
    }

    /// Returns false when the connection is unknown.
    pub fn join(&self, id: ConnectionId, room: &str) -> bool {
        {
            let Some(mut connection) = self.connections.get_mut(&id) else {
                return false;
            };
            connection.rooms.insert(room.to_string());
        }
        self.rooms.entry(room.to_string()).or_default().insert(id);
        debug!(connection = %id, room, "Joined room");
        true
    }

    pub fn leave(&self, id: ConnectionId, room: &str) {
        if let Some(mut connection) = self.connections.get_mut(&id) {
            connection.rooms.remove(room);
        }
        self.drop_member(room, id);
        debug!(connection = %id, room, "Left room");
    }

    fn drop_member(&self, room: &str, id: ConnectionId) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&id);
        }
        self.rooms.remove_if(room, |_, members| members.is_empty());
    }

    /// Queue a frame for every member of `room`. Returns how many sockets
    /// it was queued for.
    pub fn emit(&self, room: &str, frame: &Frame) -> usize {
        let members: Vec<ConnectionId> = match self.rooms.get(room) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };

        let text: Arc<str> = Arc::from(frame.to_text());
        let delivered = members
            .into_iter()
            .filter(|id| self.enqueue(*id, Arc::clone(&text)))
            .count();

        WS_FRAMES_RELAYED.inc_by(delivered as u64);
        debug!(room, event = %frame.event, delivered, "Room broadcast");
        delivered
    }

    /// Queue a frame for a single socket.
    pub fn send_to(&self, id: ConnectionId, frame: &Frame) -> bool {
        self.enqueue(id, Arc::from(frame.to_text()))
    }

    fn enqueue(&self, id: ConnectionId, text: Arc<str>) -> bool {
        let Some(connection) = self.connections.get(&id) else {
            return false;
        };
        match connection.sender.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                WS_FRAMES_DROPPED.inc();
                warn!(connection = %id, "Outbound queue full, frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn rooms_of(&self, id: ConnectionId) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .connections
            .get(&id)
            .map(|c| c.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
