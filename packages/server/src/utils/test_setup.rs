use dotenvy::dotenv;
use std::sync::Once;

use crate::models::config::GameConfig;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Deterministic deals; AI players only move when a test drives them.
pub fn test_config() -> GameConfig {
    GameConfig {
        ai_autoplay: false,
        role_seed: Some(7),
        ..GameConfig::default()
    }
}
