//! Health check endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::scheduler::TickStats;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

/// Readiness response with scheduler details.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub game_mode_id: String,
    pub queued_players: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<TickStats>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

/// Basic health check - is the service running?
async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "matchmaker".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check.
///
/// The matchmaker has no hard dependencies to probe; this reports queue
/// depth and the last tick so operators can see the loop is moving.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    Json(ReadyResponse {
        status: "ok".to_string(),
        game_mode_id: state.game_mode_id().to_string(),
        queued_players: state.queue().len(),
        last_tick: state.last_tick(),
    })
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
