//! ==============================================================================
//! server.rs - dashboard web server
//! ==============================================================================
//!
//! routes:
//!     GET /                html page: latest summary + both charts as svg
//!     GET /api/dashboard   json snapshot of the same state
//!
//! the page refreshes itself at the poll interval, so the browser picks up
//! each new frame without any client-side script.
//!
//! ==============================================================================

use crate::dashboard::{Dashboard, SharedDashboard};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    response::{Html, Json},
    routing::get,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct ServerState {
    pub dashboard: SharedDashboard,
    /// seconds between browser refreshes
    pub refresh_secs: u64,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/dashboard", get(api_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: ServerState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("[SERVER] Dashboard live at http://{}", addr);
    axum::serve(listener, router(state)).await.context("web server stopped")?;
    Ok(())
}

async fn dashboard_handler(State(state): State<ServerState>) -> Html<String> {
    let dashboard = state.dashboard.read().await;
    Html(dashboard.page(state.refresh_secs))
}

/// json api endpoint for programmatic access
async fn api_handler(State(state): State<ServerState>) -> Json<Dashboard> {
    let dashboard = state.dashboard.read().await;
    Json(dashboard.clone())
}
