use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use super::game::{GamePhase, Winner};
use super::history::{PublicHistoryEntry, RevealedRole};
use super::player::{ConnectionState, PlayerId, PlayerKind};
use super::role::{Faction, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub kind: PlayerKind,
    pub alive: bool,
    pub connection: ConnectionState,
    pub absent: bool,
    // only ever filled in for dead players
    pub role: Option<Role>,
}

/// The part of a snapshot that belongs to the viewer alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerState {
    pub player_id: PlayerId,
    pub spectator: bool,
    pub role: Option<Role>,
    pub pending_action: Option<PendingAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub target_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room_code: String,
    pub host_id: Option<PlayerId>,
    pub phase: GamePhase,
    pub phase_id: u64,
    pub deadline: Option<DateTime<Utc>>,
    pub day_number: u32,
    pub winner: Winner,
    pub corrupted: bool,
    pub players: Vec<PlayerView>,
    pub spectators: usize,
    pub history: Vec<PublicHistoryEntry>,
    pub you: Option<ViewerState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    // both carry the seat's reconnect token and only ever go to that player
    RoomCreated {
        room_code: String,
        player_id: PlayerId,
        reconnect_token: String,
    },
    RoomJoined {
        room_code: String,
        player_id: PlayerId,
        reconnect_token: String,
    },
    StateSnapshot {
        state: GameSnapshot,
    },
    PhaseChanged {
        phase: GamePhase,
        deadline: DateTime<Utc>,
        day_number: u32,
    },
    ActionAccepted {
        kind: ActionKind,
        target_id: PlayerId,
    },
    Resolution {
        deaths: Vec<PlayerId>,
        eliminated: Option<PlayerId>,
        redacted_roles: Vec<RevealedRole>,
    },
    GameOver {
        winner: Winner,
        final_roles: Vec<RevealedRole>,
        error: bool,
    },
    InvestigationResult {
        target_id: PlayerId,
        faction: Faction,
    },
    PlayerJoined {
        player: PlayerView,
        spectator: bool,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerConnection {
        player_id: PlayerId,
        connection: ConnectionState,
    },
    Rejected {
        code: String,
        reason: String,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::RoomCreated { .. } => "room_created",
            GameEvent::RoomJoined { .. } => "room_joined",
            GameEvent::StateSnapshot { .. } => "state_snapshot",
            GameEvent::PhaseChanged { .. } => "phase_changed",
            GameEvent::ActionAccepted { .. } => "action_accepted",
            GameEvent::Resolution { .. } => "resolution",
            GameEvent::GameOver { .. } => "game_over",
            GameEvent::InvestigationResult { .. } => "investigation_result",
            GameEvent::PlayerJoined { .. } => "player_joined",
            GameEvent::PlayerLeft { .. } => "player_left",
            GameEvent::PlayerConnection { .. } => "player_connection",
            GameEvent::Rejected { .. } => "rejected",
        }
    }

    /// Every (player, role) pair this event makes visible to its audience,
    /// excluding the viewer's own role inside a snapshot addressed to them.
    pub fn disclosed_roles(&self) -> Vec<(&str, Role)> {
        match self {
            GameEvent::Resolution { redacted_roles, .. } => revealed(redacted_roles),
            GameEvent::GameOver { final_roles, .. } => revealed(final_roles),
            GameEvent::StateSnapshot { state } => {
                let mut roles: Vec<(&str, Role)> = state
                    .players
                    .iter()
                    .filter_map(|p| p.role.map(|role| (p.id.as_str(), role)))
                    .collect();
                for entry in &state.history {
                    roles.extend(revealed(&entry.redacted_roles));
                }
                roles
            }
            GameEvent::PlayerJoined { player, .. } => {
                player.role.map(|role| (player.id.as_str(), role)).into_iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

fn revealed(roles: &[RevealedRole]) -> Vec<(&str, Role)> {
    roles.iter().map(|r| (r.player_id.as_str(), r.role)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "player_id", rename_all = "snake_case")]
pub enum Audience {
    Room,
    Player(PlayerId),
}

/// An event together with who may see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub audience: Audience,
    pub event: GameEvent,
}

impl Envelope {
    pub fn public(event: GameEvent) -> Self {
        Envelope {
            audience: Audience::Room,
            event,
        }
    }

    pub fn private(player_id: impl Into<PlayerId>, event: GameEvent) -> Self {
        Envelope {
            audience: Audience::Player(player_id.into()),
            event,
        }
    }

    pub fn is_visible_to(&self, viewer: Option<&str>) -> bool {
        match &self.audience {
            Audience::Room => true,
            Audience::Player(id) => viewer == Some(id.as_str()),
        }
    }
}
