//! In-process RideX node for integration tests.
//!
//! [`TestNode::start`] wires an in-memory store, the event bus and both
//! services into a gateway served on `127.0.0.1:0`. Requests go over real
//! HTTP and WebSocket connections.

use futures::{SinkExt, StreamExt};
use reqwest::{Client, Method, StatusCode};
use ridex_bus::{EventPublisher, InMemoryEventBus};
use ridex_core::{AccountService, RideService, TokenSigner};
use ridex_gateway::{GatewayConfig, GatewayService, RoomRegistry};
use ridex_store::DocumentStore;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a test waits for a frame or a room change.
pub const WAIT: Duration = Duration::from_secs(5);

/// A registered account as seen by the client.
#[derive(Debug, Clone)]
pub struct Account {
    pub token: String,
    pub id: String,
}

pub struct TestNode {
    pub addr: SocketAddr,
    pub rooms: Arc<RoomRegistry>,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl TestNode {
    /// Start a node with rate limiting off and cheap password hashing.
    pub async fn start() -> Self {
        let mut config = GatewayConfig::default();
        config.rate_limit.enabled = false;
        Self::start_with(config).await
    }

    pub async fn start_with(config: GatewayConfig) -> Self {
        let store = DocumentStore::in_memory();
        let bus = Arc::new(InMemoryEventBus::new());
        let publisher: Arc<dyn EventPublisher> = bus.clone();

        let accounts = AccountService::new(
            &store,
            TokenSigner::new("integration-secret", Duration::from_secs(3600)),
            Arc::clone(&publisher),
        )
        .with_password_iterations(1);
        let rides = RideService::new(&store, publisher);

        let gateway =
            GatewayService::new(config, accounts, rides, &bus).expect("gateway config is valid");
        let rooms = gateway.rooms();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            if let Err(e) = gateway.serve(listener, shutdown).await {
                panic!("gateway stopped with error: {e}");
            }
        });

        Self {
            addr,
            rooms,
            client: Client::new(),
            shutdown: Some(tx),
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Send a request and decode the JSON body (or the raw text).
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.expect("request reaches the node");
        let status = response.status();
        let text = response.text().await.expect("response body");
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, value)
    }

    pub async fn register_rider(&self, email: &str) -> Account {
        self.register(json!({
            "name": "Test Rider",
            "email": email,
            "password": "secret1",
            "role": "rider",
        }))
        .await
    }

    pub async fn register_driver(&self, email: &str, vehicle_type: &str) -> Account {
        self.register(json!({
            "name": "Test Driver",
            "email": email,
            "password": "secret1",
            "role": "driver",
            "vehicle": {
                "type": vehicle_type,
                "model": "Swift",
                "color": "white",
                "plateNumber": "KA01AB1234"
            }
        }))
        .await
    }

    async fn register(&self, body: Value) -> Account {
        let (status, value) = self
            .call(Method::POST, "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {value}");
        Account {
            token: value["token"].as_str().expect("token").to_string(),
            id: value["user"]["_id"].as_str().expect("user id").to_string(),
        }
    }

    /// Request a ride from MG Road to Koramangala.
    pub async fn request_ride(&self, rider: &Account, vehicle_type: &str) -> Value {
        let (status, ride) = self
            .call(
                Method::POST,
                "/api/rides/request",
                Some(&rider.token),
                Some(ride_body(vehicle_type)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "ride request failed: {ride}");
        ride
    }

    /// PATCH `/api/rides/<id>/<action>`.
    pub async fn ride_action(
        &self,
        account: &Account,
        ride_id: &str,
        action: &str,
    ) -> (StatusCode, Value) {
        self.call(
            Method::PATCH,
            &format!("/api/rides/{ride_id}/{action}"),
            Some(&account.token),
            None,
        )
        .await
    }

    pub async fn socket(&self) -> TestSocket {
        let (stream, _) = connect_async(format!("ws://{}/socket", self.addr))
            .await
            .expect("websocket handshake");
        TestSocket { stream }
    }

    /// Wait until `room` holds `size` sockets.
    pub async fn wait_for_room(&self, room: &str, size: usize) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while self.rooms.room_size(room) != size {
            assert!(
                tokio::time::Instant::now() < deadline,
                "room {room} never reached {size} members"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(WAIT, &mut self.server).await;
    }
}

pub fn ride_body(vehicle_type: &str) -> Value {
    json!({
        "pickup": { "type": "Point", "coordinates": [77.59, 12.97], "address": "MG Road" },
        "dropoff": { "type": "Point", "coordinates": [77.64, 12.93], "address": "Koramangala" },
        "vehicleType": vehicle_type
    })
}

/// Client side of a `/socket` connection speaking `{event, data}` frames.
pub struct TestSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestSocket {
    pub async fn emit(&mut self, event: &str, data: Value) {
        let frame = json!({ "event": event, "data": data }).to_string();
        self.stream
            .send(Message::text(frame))
            .await
            .expect("send frame");
    }

    pub async fn driver_online(&mut self, driver_id: &str, vehicle_type: &str) {
        self.emit(
            "driver:online",
            json!({ "driverId": driver_id, "vehicleType": vehicle_type }),
        )
        .await;
    }

    pub async fn rider_online(&mut self, rider_id: &str) {
        self.emit("rider:online", json!({ "riderId": rider_id })).await;
    }

    /// Next text frame, or `None` if nothing arrives within `wait`.
    pub async fn next_frame_within(&mut self, wait: Duration) -> Option<Value> {
        let read = async {
            while let Some(message) = self.stream.next().await {
                match message.ok()? {
                    Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
                    Message::Close(_) => return None,
                    _ => continue,
                }
            }
            None
        };
        tokio::time::timeout(wait, read).await.ok().flatten()
    }

    /// Next frame; panics after [`WAIT`].
    pub async fn next_frame(&mut self) -> Value {
        self.next_frame_within(WAIT)
            .await
            .expect("expected a frame before the deadline")
    }

    /// Skip frames until one named `event` arrives.
    pub async fn expect_event(&mut self, event: &str) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame["event"] == event {
                return frame["data"].clone();
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
