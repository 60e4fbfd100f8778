use rand::{rngs::StdRng, SeedableRng};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::error::{GameError, GameResult};
use crate::models::{config::GameConfig, room::Room};
use crate::services::{
    broadcaster::{ChannelBroadcaster, EventBroadcaster, Fanout},
    timer::TimerRegistry,
};

/// A room plus the random source its role deals and AI choices draw from.
pub struct RoomSlot {
    pub room: Room,
    pub rng: StdRng,
}

pub type SharedRoom = Arc<Mutex<RoomSlot>>;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, SharedRoom>>>,
    pub hub: Arc<ChannelBroadcaster>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub timers: TimerRegistry,
    pub config: Arc<GameConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::from_env())
    }

    pub fn with_config(config: GameConfig) -> Self {
        let hub = Arc::new(ChannelBroadcaster::new());
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            broadcaster: hub.clone(),
            hub,
            timers: TimerRegistry::new(),
            config: Arc::new(config),
        }
    }

    /// Sockets still get their events; `extra` sees a copy of each one.
    pub fn with_broadcaster(config: GameConfig, extra: Arc<dyn EventBroadcaster>) -> Self {
        let mut state = Self::with_config(config);
        let hub: Arc<dyn EventBroadcaster> = state.hub.clone();
        state.broadcaster = Arc::new(Fanout(vec![hub, extra]));
        state
    }

    pub async fn room(&self, room_code: &str) -> GameResult<SharedRoom> {
        self.rooms
            .lock()
            .await
            .get(room_code)
            .cloned()
            .ok_or_else(|| GameError::RoomNotFound(room_code.to_string()))
    }

    pub fn new_rng(&self, seed: Option<u64>) -> StdRng {
        match seed.or(self.config.role_seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
