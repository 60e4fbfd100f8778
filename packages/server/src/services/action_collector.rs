use chrono::{DateTime, Utc};

use crate::error::{GameError, GameResult, RejectReason};
use crate::models::{
    action::{Accepted, ActionKind},
    game::GamePhase,
    room::Room,
};

/// Validates a submission against the room's current state. Checks run in a
/// fixed order: phase, actor liveness, role, target. Nothing is mutated.
pub fn validate(
    room: &Room,
    actor_id: &str,
    kind: ActionKind,
    target_id: &str,
    phase_id: Option<u64>,
) -> GameResult<()> {
    let game = room
        .game
        .as_ref()
        .ok_or_else(|| GameError::GameNotFound(room.code.clone()))?;

    if game.phase == GamePhase::GameOver {
        return Err(GameError::StateConflict {
            phase_id: phase_id.unwrap_or(game.phase_id),
        });
    }
    if let Some(expected) = phase_id {
        if expected != game.phase_id {
            return Err(GameError::StateConflict { phase_id: expected });
        }
    }
    if kind.accepting_phase() != game.phase {
        return Err(RejectReason::WrongPhase.into());
    }

    let actor = room.player(actor_id).ok_or(RejectReason::ActorNotFound)?;
    if !actor.alive {
        return Err(RejectReason::ActorDead.into());
    }
    if actor.grace_expired {
        return Err(RejectReason::ActorAbsent.into());
    }

    let role = actor.role.ok_or(RejectReason::RoleNotAuthorized)?;
    if !role.can_perform(kind) {
        return Err(RejectReason::RoleNotAuthorized.into());
    }

    let target = room.player(target_id).ok_or(RejectReason::TargetNotFound)?;
    if !target.alive {
        return Err(RejectReason::TargetDead.into());
    }
    if target.id == actor.id {
        let allowed = match kind {
            ActionKind::Heal => game.rules.allow_self_heal,
            ActionKind::Vote => game.rules.allow_self_vote,
            ActionKind::Kill | ActionKind::Investigate => false,
        };
        if !allowed {
            return Err(RejectReason::SelfTargetForbidden.into());
        }
    }

    Ok(())
}

/// Validate-then-record. A rejected submission leaves the room untouched.
pub fn submit(
    room: &mut Room,
    actor_id: &str,
    kind: ActionKind,
    target_id: &str,
    phase_id: Option<u64>,
    now: DateTime<Utc>,
) -> GameResult<Accepted> {
    validate(room, actor_id, kind, target_id, phase_id)?;

    let game = room
        .game
        .as_mut()
        .ok_or_else(|| GameError::GameNotFound(room.code.clone()))?;
    let accepted = game.actions.record(actor_id, kind, target_id, now);
    room.last_activity = now;
    Ok(accepted)
}

/// True once every actor whose input ends the phase early has submitted.
/// Absent players still count as missing; the phase timer covers them.
pub fn phase_complete(room: &Room) -> bool {
    let Some(game) = room.game.as_ref() else {
        return false;
    };

    match game.phase {
        GamePhase::NightAction => {
            let mut required = room
                .alive_players()
                .filter_map(|p| {
                    p.role
                        .filter(|r| r.gates_night())
                        .and_then(|r| r.night_action())
                        .map(|kind| (p, kind))
                })
                .peekable();
            required.peek().is_some()
                && required.all(|(p, kind)| game.actions.has_submitted(&p.id, kind))
        }
        GamePhase::DayVote => {
            let mut voters = room.alive_players().peekable();
            voters.peek().is_some()
                && voters.all(|p| game.actions.has_submitted(&p.id, ActionKind::Vote))
        }
        _ => false,
    }
}
