//! Matchmaking intake.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use matchforge_id::PlayerId;
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueuePlayerRequest {
    pub player_id: PlayerId,
    #[serde(default)]
    pub auto_teleport: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/queue", post(queue_player))
}

/// Queue a player for the next matchmaking tick.
///
/// Acceptance is all the caller gets back; the outcome arrives later as a
/// `match.created` message, or not at all.
async fn queue_player(
    State(state): State<AppState>,
    body: Result<Json<QueuePlayerRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = body.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(e) => ApiError::unprocessable("invalid_request", e.body_text()),
        other => ApiError::bad_request("invalid_json", other.body_text()),
    })?;

    debug!(
        player_id = %request.player_id,
        auto_teleport = request.auto_teleport,
        game_mode_id = %state.game_mode_id(),
        "Queueing player"
    );
    state
        .queue()
        .queue_player(request.player_id, request.auto_teleport);

    Ok(StatusCode::ACCEPTED)
}
