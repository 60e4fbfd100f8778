use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

pub type PlayerId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Human,
    Ai,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    pub role: Option<Role>,
    pub alive: bool,
    pub connection: ConnectionState,
    pub disconnected_at: Option<DateTime<Utc>>,
    // handed only to the player; required to take the seat back
    pub reconnect_token: String,
    // grace period ran out; the player can never act or reconnect again
    pub grace_expired: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, kind: PlayerKind) -> Self {
        Self {
            id,
            name,
            kind,
            role: None,
            alive: true,
            connection: ConnectionState::Connected,
            disconnected_at: None,
            reconnect_token: uuid::Uuid::new_v4().simple().to_string(),
            grace_expired: false,
        }
    }

    pub fn human(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name.into(), PlayerKind::Human)
    }

    pub fn ai(name: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name.into(), PlayerKind::Ai)
    }

    pub fn is_ai(&self) -> bool {
        self.kind == PlayerKind::Ai
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Disconnected but still inside the reconnection grace period.
    pub fn awaiting_reconnect(&self) -> bool {
        self.connection == ConnectionState::Disconnected && !self.grace_expired
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    pub fn mark_disconnected(&mut self, now: DateTime<Utc>) {
        self.connection = ConnectionState::Disconnected;
        self.disconnected_at = Some(now);
    }

    pub fn mark_connected(&mut self) {
        self.connection = ConnectionState::Connected;
        self.disconnected_at = None;
    }

    pub fn mark_absent(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.grace_expired = true;
    }
}
