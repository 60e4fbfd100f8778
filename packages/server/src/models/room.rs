use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::{Game, GamePhase};
use super::player::{Player, PlayerKind};
use crate::error::{GameError, GameResult};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Open,
    InProgress,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Joined {
    pub player_id: String,
    pub reconnect_token: String,
    pub spectator: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Departure {
    // lobby: the seat is freed
    Removed,
    // game running: stays seated, can no longer act
    MarkedAbsent,
    SpectatorLeft,
}

/// What the lobby listing shows about a room.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoomSummary {
    pub code: String,
    pub name: Option<String>,
    pub status: RoomStatus,
    pub phase: GamePhase,
    pub players: usize,
    pub max_players: usize,
    pub spectators: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    pub code: String,
    pub name: Option<String>,
    pub players: Vec<Player>,
    pub spectators: Vec<Player>,
    pub host_id: Option<String>,
    pub max_players: usize,
    pub allow_spectators: bool,
    pub game: Option<Game>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(
        code: String,
        name: Option<String>,
        max_players: usize,
        allow_spectators: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Room {
            code,
            name,
            players: Vec::new(),
            spectators: Vec::new(),
            host_id: None,
            max_players,
            allow_spectators,
            game: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn status(&self) -> RoomStatus {
        match &self.game {
            None => RoomStatus::Open,
            Some(game) if game.is_over() => RoomStatus::Closed,
            Some(_) => RoomStatus::InProgress,
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            name: self.name.clone(),
            status: self.status(),
            phase: self.phase(),
            players: self.players.len(),
            max_players: self.max_players,
            spectators: self.spectators.len(),
            created_at: self.created_at,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.game
            .as_ref()
            .map(|g| g.phase)
            .unwrap_or(GamePhase::Lobby)
    }

    pub fn has_started(&self) -> bool {
        self.game.is_some()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn spectator(&self, player_id: &str) -> Option<&Player> {
        self.spectators.iter().find(|p| p.id == player_id)
    }

    fn member_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        let Room {
            players,
            spectators,
            ..
        } = self;
        players
            .iter_mut()
            .chain(spectators.iter_mut())
            .find(|p| p.id == player_id)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id.as_deref() == Some(player_id)
    }

    pub fn join(&mut self, player: Player, now: DateTime<Utc>) -> GameResult<Joined> {
        if self.has_started() {
            if !self.allow_spectators {
                return Err(GameError::GameInProgress);
            }
            let player_id = player.id.clone();
            let reconnect_token = player.reconnect_token.clone();
            self.spectators.push(player);
            self.last_activity = now;
            return Ok(Joined {
                player_id,
                reconnect_token,
                spectator: true,
            });
        }

        if self.players.len() >= self.max_players {
            return Err(GameError::RoomFull);
        }

        let player_id = player.id.clone();
        let reconnect_token = player.reconnect_token.clone();
        if self.host_id.is_none() && player.kind == PlayerKind::Human {
            self.host_id = Some(player_id.clone());
        }
        self.players.push(player);
        self.last_activity = now;
        Ok(Joined {
            player_id,
            reconnect_token,
            spectator: false,
        })
    }

    pub fn leave(&mut self, player_id: &str, now: DateTime<Utc>) -> GameResult<Departure> {
        self.last_activity = now;

        if let Some(index) = self.spectators.iter().position(|p| p.id == player_id) {
            self.spectators.remove(index);
            return Ok(Departure::SpectatorLeft);
        }

        if self.has_started() {
            let player = self
                .player_mut(player_id)
                .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
            player.mark_absent();
            // an absent player's pending action does not count
            if let Some(game) = self.game.as_mut() {
                game.actions.withdraw(player_id);
            }
            return Ok(Departure::MarkedAbsent);
        }

        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        self.players.remove(index);
        if self.is_host(player_id) {
            self.host_id = self
                .players
                .iter()
                .find(|p| p.kind == PlayerKind::Human)
                .map(|p| p.id.clone());
        }
        Ok(Departure::Removed)
    }

    /// Transport dropped. Returns the disconnect time used to key the grace timer.
    pub fn disconnect(&mut self, player_id: &str, now: DateTime<Utc>) -> GameResult<DateTime<Utc>> {
        let member = self
            .member_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        member.mark_disconnected(now);
        self.last_activity = now;
        Ok(now)
    }

    /// Takes a dropped seat back. Only the holder of the seat's token may,
    /// and only while the seat is actually disconnected.
    pub fn reconnect(
        &mut self,
        player_id: &str,
        reconnect_token: &str,
        now: DateTime<Utc>,
    ) -> GameResult<()> {
        let member = self
            .member_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        if member.reconnect_token != reconnect_token {
            return Err(GameError::ReconnectDenied(player_id.to_string()));
        }
        if member.grace_expired {
            return Err(GameError::ReconnectWindowClosed(player_id.to_string()));
        }
        if member.is_connected() {
            return Err(GameError::AlreadyConnected(player_id.to_string()));
        }
        member.mark_connected();
        self.last_activity = now;
        Ok(())
    }

    /// Grace period for the disconnect at `since` ran out. Returns `None` when the
    /// player reconnected (or disconnected again later) in the meantime.
    pub fn expire_grace(
        &mut self,
        player_id: &str,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Departure> {
        let member = self.member_mut(player_id)?;
        if member.is_connected() || member.disconnected_at != Some(since) {
            return None;
        }
        self.leave(player_id, now).ok()
    }

    /// No connected humans and nobody inside a reconnection window.
    pub fn is_collectable(&self) -> bool {
        self.players
            .iter()
            .chain(self.spectators.iter())
            .filter(|p| p.kind == PlayerKind::Human)
            .all(|p| !p.is_connected() && !p.awaiting_reconnect())
    }
}
