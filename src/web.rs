//! Axum-based HTTP server exposing the current meter readings
//!
//! Read-only surface for the presentation layer: a health probe and the
//! latest coordinator snapshot.

use crate::coordinator::MeterSnapshot;
use crate::error::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Latest coordinator snapshot
    pub snapshot_rx: watch::Receiver<MeterSnapshot>,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    let mut body = serde_json::to_value(&snapshot)
        .unwrap_or_else(|_| serde_json::json!({"error": "serialization"}));
    if let Some(obj) = body.as_object_mut() {
        obj.insert(
            "version".to_string(),
            serde_json::json!(env!("APP_VERSION")),
        );
    }
    Json(body)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until the task is aborted
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .unwrap_or(([127, 0, 0, 1], port).into());
    info!("Web server listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
    Ok(())
}
