//! Gateway service: router assembly, background tasks and the serve loop.

use crate::domain::config::{GatewayConfig, WebSocketConfig};
use crate::domain::error::GatewayError;
use crate::middleware::{
    cleanup_task, create_cors_layer, RateLimitLayer, TimeoutLayer, TracingLayer,
};
use crate::rest::{accounts, rides, system};
use crate::ws::{relay_filter, spawn_relay, RoomRegistry};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::Router;
use ridex_bus::{InMemoryEventBus, Subscription};
use ridex_core::{AccountService, RideService};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub rides: RideService,
    pub rooms: Arc<RoomRegistry>,
    pub websocket: Arc<WebSocketConfig>,
}

/// The HTTP + WebSocket front of a node.
pub struct GatewayService {
    config: GatewayConfig,
    state: AppState,
    rate_limit: RateLimitLayer,
    /// Taken when background tasks start
    relay_subscription: Option<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayService {
    /// Validate the config and subscribe the relay to the bus.
    ///
    /// The relay subscribes here, before any request can publish, so no
    /// event emitted after construction is missed.
    pub fn new(
        config: GatewayConfig,
        accounts: AccountService,
        rides: RideService,
        bus: &InMemoryEventBus,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let state = AppState {
            accounts,
            rides,
            rooms: Arc::new(RoomRegistry::new(config.websocket.queue_size)),
            websocket: Arc::new(config.websocket.clone()),
        };

        Ok(Self {
            rate_limit: RateLimitLayer::new(config.rate_limit.clone()),
            relay_subscription: Some(bus.subscribe(relay_filter())),
            config,
            state,
            tasks: Vec::new(),
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub fn rooms(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.state.rooms)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the full router with every middleware layer.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config, self.rate_limit.clone())
    }

    /// Start the bus relay and the rate limit bucket sweeper. Idempotent.
    pub fn start_background_tasks(&mut self) {
        let Some(subscription) = self.relay_subscription.take() else {
            return;
        };
        self.tasks
            .push(spawn_relay(subscription, Arc::clone(&self.state.rooms)));

        let idle = Duration::from_secs(self.config.rate_limit.bucket_idle_secs);
        self.tasks.push(tokio::spawn(cleanup_task(
            self.rate_limit.state(),
            idle.max(Duration::from_secs(1)),
            idle,
        )));
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(mut self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.start_background_tasks();
        let router = self.router();

        let local = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %local, "RideX gateway listening");

        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("RideX gateway stopped");

        result.map_err(|e| GatewayError::Serve(e.to_string()))
    }
}

/// Assemble routes and middleware.
pub fn build_router(state: AppState, config: &GatewayConfig, rate_limit: RateLimitLayer) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&config.cors))
        .layer(TracingLayer::new())
        .layer(TimeoutLayer::new(config.limits.request_timeout()))
        .layer(rate_limit);

    let api = Router::new()
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/update-user", put(accounts::update_profile))
        .route("/users/location", patch(accounts::update_location))
        .route("/users/status", patch(accounts::set_status))
        .route("/users/me", get(accounts::me))
        .route("/users/profile", put(accounts::update_profile))
        .route("/rides/estimate", post(rides::estimate))
        .route("/rides/request", post(rides::request))
        .route("/rides/available", get(rides::available))
        .route("/rides/scheduled", get(rides::scheduled))
        .route("/rides/history", get(rides::history))
        .route("/rides/:id", get(rides::get_ride))
        .route("/rides/:id/accept", patch(rides::accept))
        .route("/rides/:id/start", patch(rides::start))
        .route("/rides/:id/complete", patch(rides::complete))
        .route("/rides/:id/cancel", patch(rides::cancel));

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .route("/socket", get(system::socket))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
        .layer(middleware)
        .with_state(state)
}
