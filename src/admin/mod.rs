//! Admin HTTP surface — a second `axum` router distinct from the TCP
//! ingress, serving CRUD over the data model plus the dashboard endpoints
//! and the publish-only live feed. Grounded on `gateway/server.rs` and
//! `gateway/routes.rs`'s router-building shape, minus the bidirectional
//! OC-protocol WebSocket machinery this surface doesn't need.

mod auth;
mod routes;
mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::sync::broadcast;
use tracing::info;

use crate::engine::Engine;
use crate::persistence::PersistenceAdapter;

pub use auth::admin_auth_layer;

/// Shared state for every admin route handler.
#[derive(Clone)]
pub struct AdminState {
    pub persistence: Arc<PersistenceAdapter>,
    pub engine: Arc<Engine>,
    pub token: Option<String>,
    pub start_time: std::time::Instant,
    pub version: String,
}

/// Build the admin router: CRUD + dashboard routes, `/health`, `/ws`, and
/// (when configured) a bearer-token-gating layer over every route.
pub fn build_admin_routes(state: AdminState) -> Router {
    routes::build_routes(state)
}

/// Run the admin HTTP server until the shutdown signal fires.
pub async fn serve(
    addr: SocketAddr,
    state: AdminState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = build_admin_routes(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "admin http surface listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        info!("admin http surface shutting down");
    })
    .await?;

    Ok(())
}
