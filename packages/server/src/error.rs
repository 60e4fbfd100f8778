use serde::{Deserialize, Serialize};

/// Why a submitted action was refused by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("this action is not accepted in the current phase")]
    WrongPhase,
    #[error("actor is not a player in this room")]
    ActorNotFound,
    #[error("dead players cannot act")]
    ActorDead,
    #[error("actor has been marked absent")]
    ActorAbsent,
    #[error("actor's role cannot perform this action")]
    RoleNotAuthorized,
    #[error("target is not a player in this room")]
    TargetNotFound,
    #[error("target is not alive")]
    TargetDead,
    #[error("this action cannot target yourself")]
    SelfTargetForbidden,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::WrongPhase => "wrong_phase",
            RejectReason::ActorNotFound => "actor_not_found",
            RejectReason::ActorDead => "actor_dead",
            RejectReason::ActorAbsent => "actor_absent",
            RejectReason::RoleNotAuthorized => "role_not_authorized",
            RejectReason::TargetNotFound => "target_not_found",
            RejectReason::TargetDead => "target_dead",
            RejectReason::SelfTargetForbidden => "self_target_forbidden",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("validation failed: {0}")]
    Validation(#[from] RejectReason),
    #[error("phase {phase_id} is no longer accepting actions")]
    StateConflict { phase_id: u64 },
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("no game has been started in room {0}")]
    GameNotFound(String),
    #[error("player {0} not found")]
    PlayerNotFound(String),
    #[error("room is full")]
    RoomFull,
    #[error("game already in progress")]
    GameInProgress,
    #[error("at least {required} players are needed, room has {actual}")]
    NotEnoughPlayers { required: usize, actual: usize },
    #[error("only the host can do this")]
    NotHost,
    #[error("invalid role set: {0}")]
    InvalidRoleSet(String),
    #[error("player {0} can no longer reconnect")]
    ReconnectWindowClosed(String),
    #[error("reconnect token does not match player {0}")]
    ReconnectDenied(String),
    #[error("player {0} is already connected")]
    AlreadyConnected(String),
    #[error("connection has not joined a room")]
    NotInRoom,
    #[error("malformed intent: {0}")]
    MalformedIntent(String),
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients in `rejected` events.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Validation(reason) => reason.as_str(),
            GameError::StateConflict { .. } => "state_conflict",
            GameError::RoomNotFound(_) => "room_not_found",
            GameError::GameNotFound(_) => "game_not_found",
            GameError::PlayerNotFound(_) => "player_not_found",
            GameError::RoomFull => "room_full",
            GameError::GameInProgress => "game_in_progress",
            GameError::NotEnoughPlayers { .. } => "not_enough_players",
            GameError::NotHost => "not_host",
            GameError::InvalidRoleSet(_) => "invalid_role_set",
            GameError::ReconnectWindowClosed(_) => "reconnect_window_closed",
            GameError::ReconnectDenied(_) => "reconnect_denied",
            GameError::AlreadyConnected(_) => "already_connected",
            GameError::NotInRoom => "not_in_room",
            GameError::MalformedIntent(_) => "malformed_intent",
            GameError::InvariantViolation(_) => "internal_error",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, GameError::Validation(_))
    }
}

pub type GameResult<T> = Result<T, GameError>;
