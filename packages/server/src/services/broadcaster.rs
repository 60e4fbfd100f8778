use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::models::event::{Audience, Envelope, GameEvent};

const ROOM_CHANNEL_CAPACITY: usize = 1000;

/// Delivery seam between the game core and whatever transport carries events.
pub trait EventBroadcaster: Send + Sync {
    fn emit(&self, room_code: &str, envelope: Envelope);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One broadcast channel per room. Each subscriber filters by audience.
#[derive(Default)]
pub struct ChannelBroadcaster {
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_room_channel(&self, room_code: &str) -> broadcast::Sender<Envelope> {
        let mut channels = lock(&self.channels);
        channels
            .entry(room_code.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .clone()
    }

    /// `None` when the room has no channel, i.e. does not exist.
    pub fn subscribe(&self, room_code: &str) -> Option<broadcast::Receiver<Envelope>> {
        lock(&self.channels).get(room_code).map(|tx| tx.subscribe())
    }

    /// Drops the room's channel; open subscriptions see it closed.
    pub fn close_room(&self, room_code: &str) {
        lock(&self.channels).remove(room_code);
    }
}

impl EventBroadcaster for ChannelBroadcaster {
    fn emit(&self, room_code: &str, envelope: Envelope) {
        let sender = lock(&self.channels).get(room_code).cloned();
        if let Some(sender) = sender {
            // no subscribers is fine: the snapshot covers late joiners
            let _ = sender.send(envelope);
        }
    }
}

/// Keeps every emitted envelope in order. Used by tests to inspect what a
/// transport would have delivered.
#[derive(Default)]
pub struct RecordingBroadcaster {
    log: Mutex<Vec<(String, Envelope)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<(String, Envelope)> {
        lock(&self.log).clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        lock(&self.log).iter().map(|(_, e)| e.event.name()).collect()
    }

    /// What a connection for `viewer` in `room_code` would have received.
    pub fn visible_to(&self, room_code: &str, viewer: Option<&str>) -> Vec<GameEvent> {
        lock(&self.log)
            .iter()
            .filter(|(code, e)| code == room_code && e.is_visible_to(viewer))
            .map(|(_, e)| e.event.clone())
            .collect()
    }

    pub fn public(&self) -> Vec<GameEvent> {
        lock(&self.log)
            .iter()
            .filter(|(_, e)| e.audience == Audience::Room)
            .map(|(_, e)| e.event.clone())
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.log).clear();
    }
}

impl EventBroadcaster for RecordingBroadcaster {
    fn emit(&self, room_code: &str, envelope: Envelope) {
        lock(&self.log).push((room_code.to_string(), envelope));
    }
}

/// Fans out to several broadcasters in order.
pub struct Fanout(pub Vec<Arc<dyn EventBroadcaster>>);

impl EventBroadcaster for Fanout {
    fn emit(&self, room_code: &str, envelope: Envelope) {
        for target in &self.0 {
            target.emit(room_code, envelope.clone());
        }
    }
}
