//! HTTP/WebSocket front door: the thin transport glue around the hub.

use std::net::{Ipv4Addr, SocketAddr};

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::router::SignalHub;

pub mod ws;

/// Front-door configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Outbound event queue capacity per connection.
    pub send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9000)),
            send_queue: 256,
        }
    }
}

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: SignalHub,
    pub send_queue: usize,
}

/// Build the axum router with the WebSocket and health routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the listener fails.
pub async fn serve(config: ServerConfig, hub: SignalHub) -> Result<(), ServeError> {
    let state = AppState {
        hub,
        send_queue: config.send_queue,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(ServeError::Bind)?;
    info!(addr = %config.addr, "Relay listening");

    axum::serve(listener, router).await.map_err(ServeError::Serve)
}

/// Liveness counters for load balancers and smoke tests.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.hub.registry().connection_count().await;
    let running_sessions = state.hub.sessions().count().await;
    axum::Json(serde_json::json!({
        "status": "healthy",
        "connections": connections,
        "runningSessions": running_sessions,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to bind listener: {0}")]
    Bind(std::io::Error),

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}
