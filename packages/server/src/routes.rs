use crate::{error::GameError, state::AppState, utils::websocket};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

mod game;
mod room;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .nest("/api/room", room::routes(state.clone()))
        .nest("/api/game", game::routes(state.clone()))
        // websocat ws://localhost:8080/api/ws
        .merge(
            Router::new()
                .route("/api/ws", get(websocket::handler))
                .with_state(state),
        )
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::RoomNotFound(_)
            | GameError::GameNotFound(_)
            | GameError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            GameError::Validation(_) | GameError::MalformedIntent(_) => StatusCode::BAD_REQUEST,
            GameError::NotHost | GameError::NotInRoom | GameError::ReconnectDenied(_) => StatusCode::FORBIDDEN,
            GameError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::CONFLICT,
        };
        (
            status,
            Json(json!({ "error": self.to_string(), "code": self.code() })),
        )
            .into_response()
    }
}
