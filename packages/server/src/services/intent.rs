use serde::{Deserialize, Serialize};

use crate::models::{action::ActionKind, player::PlayerId};

/// Everything a client may ask for over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    RoomCreate {
        name: String,
    },
    RoomJoin {
        room_code: String,
        name: String,
    },
    RoomLeave,
    Reconnect {
        room_code: String,
        player_id: PlayerId,
        reconnect_token: String,
    },
    AddAi {
        name: String,
    },
    GameStart,
    NightAction {
        kind: ActionKind,
        target_id: PlayerId,
        #[serde(default)]
        phase_id: Option<u64>,
    },
    DayVote {
        target_id: PlayerId,
        #[serde(default)]
        phase_id: Option<u64>,
    },
    RequestSnapshot,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::RoomCreate { .. } => "room_create",
            Intent::RoomJoin { .. } => "room_join",
            Intent::RoomLeave => "room_leave",
            Intent::Reconnect { .. } => "reconnect",
            Intent::AddAi { .. } => "add_ai",
            Intent::GameStart => "game_start",
            Intent::NightAction { .. } => "night_action",
            Intent::DayVote { .. } => "day_vote",
            Intent::RequestSnapshot => "request_snapshot",
        }
    }

    /// Intents that only make sense for a connection already seated in a room.
    pub fn needs_seat(&self) -> bool {
        !matches!(
            self,
            Intent::RoomCreate { .. } | Intent::RoomJoin { .. } | Intent::Reconnect { .. }
        )
    }
}

/// Identity a connection takes on after a successful create, join or reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room_code: String,
    pub player_id: PlayerId,
    pub reconnect_token: String,
}
