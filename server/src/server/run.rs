// Router construction and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Json, Router};

use crate::notify::ChannelNotifier;
use crate::state::AppState;

/// Axum state for the websocket transport: the shared application state
/// plus the concrete channel registry behind the notifier seam.
#[derive(Clone)]
pub struct TransportState {
    pub app: AppState,
    pub channels: Arc<ChannelNotifier>,
}

pub fn build_router(app: AppState, channels: Arc<ChannelNotifier>) -> Router {
    let state = TransportState { app, channels };
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "ok": true })) }),
        )
        .route("/ws", get(crate::server::ws::ws_handler))
        .with_state(state)
}

pub async fn run_server(
    addr: SocketAddr,
    app: AppState,
    channels: Arc<ChannelNotifier>,
) -> Result<()> {
    let router = build_router(app, channels);

    let display_addr = if addr.ip().to_string() == "127.0.0.1" {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    };
    tracing::info!(display_addr = %display_addr, "blackjack server running");
    tracing::info!("connect clients to ws://{}/ws", display_addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", display_addr))?;
    let _ = axum::serve(listener, router).await;
    Ok(())
}
