use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use chrono::Utc;
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mafia_server::{app, services::room_service, state::AppState, utils::config::CONFIG};

fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("mafia_server", LevelFilter::Debug)
        .filter_module("tower_http", LevelFilter::Debug)
        .filter_module("axum", LevelFilter::Debug)
        .parse_default_env()
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

fn spawn_room_sweeper(state: AppState) {
    let every = Duration::from_secs(CONFIG.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            room_service::sweep_idle_rooms(&state, Utc::now()).await;
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    if let Err(e) = dotenv() {
        eprintln!("Warning: failed to load .env file: {}", e);
    }

    init_logger();

    let state = AppState::new();
    info!(
        "Game config: {} to {} players, night {:?}, discussion {:?}, vote {:?}",
        state.config.min_players,
        state.config.max_players,
        state.config.night_duration,
        state.config.discussion_duration,
        state.config.vote_duration
    );
    spawn_room_sweeper(state.clone());

    let origin = CONFIG
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .context("CORS_ALLOWED_ORIGIN is not a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE]);

    let app = app::create_app_with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        );

    let addr = CONFIG.server_addr;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
