use crate::routes;
use crate::state::AppState;
use axum::Router;

pub fn create_app_with_state(state: AppState) -> Router {
    routes::create_routes(state)
}
