use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::{error::GameError, services::game_service, state::AppState, utils::room_code};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:code",
            Router::new()
                // public view, no roles of living players
                .route("/state", get(get_game_state))
                .route("/history", get(get_history)),
        )
        .with_state(state)
}

pub async fn get_game_state(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    let snapshot = game_service::snapshot_for(&state, &room_code::normalize(&code), None).await?;
    Ok((StatusCode::OK, Json(snapshot)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, GameError> {
    let history = game_service::get_history(&state, &room_code::normalize(&code)).await?;
    Ok((StatusCode::OK, Json(history)))
}
