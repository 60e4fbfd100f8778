//! The game phase state machine.
//!
//! Every function here takes a room that the caller has exclusive access to,
//! applies one transition and returns the events it produced. Timers, locks
//! and delivery live in `game_service`.

use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use tracing::{error, info, warn};

use super::{action_collector, resolution, snapshot};
use crate::audit::history_hash;
use crate::error::{GameError, GameResult};
use crate::models::{
    action::{Accepted, ActionKind},
    config::GameConfig,
    event::{Audience, Envelope, GameEvent},
    game::{Game, GamePhase, GameRules, Winner},
    history::{HistoryEntry, Outcome},
    role::Role,
    room::Room,
};

/// Starts the game in a lobby room: deals a shuffled role set and opens the
/// first night. Only the host may start; `actor_id` is `None` for internal
/// callers that already checked.
pub fn start_game<R: Rng + ?Sized>(
    room: &mut Room,
    config: &GameConfig,
    actor_id: Option<&str>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> GameResult<Vec<Envelope>> {
    if room.has_started() {
        return Err(GameError::GameInProgress);
    }
    if let Some(actor) = actor_id {
        if room.player(actor).is_none() {
            return Err(GameError::NotInRoom);
        }
        if !room.is_host(actor) {
            return Err(GameError::NotHost);
        }
    }

    let mut roles = config.role_set(room.players.len())?;
    roles.shuffle(rng);
    begin_with_roles(room, roles, config.rules(), now)
}

/// Deals `roles` to the seated players in seat order and opens night one.
pub fn begin_with_roles(
    room: &mut Room,
    roles: Vec<Role>,
    rules: GameRules,
    now: DateTime<Utc>,
) -> GameResult<Vec<Envelope>> {
    if room.has_started() {
        return Err(GameError::GameInProgress);
    }
    if roles.len() != room.players.len() {
        return Err(GameError::InvalidRoleSet(format!(
            "{} roles for {} players",
            roles.len(),
            room.players.len()
        )));
    }
    for required in [Role::MafiaLeader, Role::Healer] {
        let count = roles.iter().filter(|r| **r == required).count();
        if count != 1 {
            return Err(GameError::InvalidRoleSet(format!(
                "expected exactly one {}, got {}",
                required, count
            )));
        }
    }

    for (player, role) in room.players.iter_mut().zip(roles) {
        player.role = Some(role);
        player.alive = true;
    }

    let mut game = Game::new(rules, now);
    game.day_number = 1;
    room.game = Some(game);
    room.last_activity = now;

    let mut events = vec![enter(room, GamePhase::NightAction, now)?];
    for player in &room.players {
        events.push(Envelope::private(
            player.id.clone(),
            GameEvent::StateSnapshot {
                state: snapshot::build(room, Some(&player.id)),
            },
        ));
    }
    info!(
        "Game started in room {} with {} players",
        room.code,
        room.players.len()
    );
    Ok(events)
}

/// Records an action and resolves the phase straight away once every gating
/// actor has submitted.
pub fn submit_action(
    room: &mut Room,
    actor_id: &str,
    kind: ActionKind,
    target_id: &str,
    phase_id: Option<u64>,
    now: DateTime<Utc>,
) -> GameResult<(Accepted, Vec<Envelope>)> {
    let accepted = action_collector::submit(room, actor_id, kind, target_id, phase_id, now)?;

    let mut events = vec![Envelope::private(
        actor_id,
        GameEvent::ActionAccepted {
            kind: accepted.kind,
            target_id: accepted.target_id.clone(),
        },
    )];
    if action_collector::phase_complete(room) {
        events.extend(resolve(room, now));
    }
    Ok((accepted, events))
}

/// Phase timer fired for `phase_id`. A stale id (the phase already moved on)
/// is a no-op.
pub fn on_deadline(room: &mut Room, phase_id: u64, now: DateTime<Utc>) -> Vec<Envelope> {
    let Some(game) = room.game.as_ref() else {
        return Vec::new();
    };
    if game.phase_id != phase_id {
        return Vec::new();
    }

    match game.phase {
        GamePhase::NightAction | GamePhase::DayVote => resolve(room, now),
        GamePhase::DayDiscussion => match enter(room, GamePhase::DayVote, now) {
            Ok(event) => vec![event],
            Err(e) => corrupt(room, &e.to_string(), now),
        },
        _ => Vec::new(),
    }
}

/// Current phase id and deadline when the phase runs on a timer.
pub fn timed_phase(room: &Room) -> Option<(u64, DateTime<Utc>)> {
    room.game
        .as_ref()
        .filter(|g| g.phase.is_timed())
        .map(|g| (g.phase_id, g.phase_deadline))
}

fn enter(room: &mut Room, phase: GamePhase, now: DateTime<Utc>) -> GameResult<Envelope> {
    let game = room
        .game
        .as_mut()
        .ok_or_else(|| GameError::GameNotFound(room.code.clone()))?;
    game.enter(phase, now);
    Ok(Envelope::public(GameEvent::PhaseChanged {
        phase,
        deadline: game.phase_deadline,
        day_number: game.day_number,
    }))
}

fn resolve(room: &mut Room, now: DateTime<Utc>) -> Vec<Envelope> {
    let resolving = room.phase();
    let mut events = Vec::new();
    match enter(room, GamePhase::Resolution, now) {
        Ok(event) => events.push(event),
        Err(e) => return corrupt(room, &e.to_string(), now),
    }

    match apply_resolution(room, resolving, now) {
        Ok(more) => events.extend(more),
        Err(e) => events.extend(corrupt(room, &e.to_string(), now)),
    }
    events
}

fn apply_resolution(
    room: &mut Room,
    resolving: GamePhase,
    now: DateTime<Utc>,
) -> GameResult<Vec<Envelope>> {
    let game = room
        .game
        .as_ref()
        .ok_or_else(|| GameError::GameNotFound(room.code.clone()))?;

    let outcome = match resolving {
        GamePhase::NightAction => resolution::resolve_night(&room.players, &game.actions)?,
        GamePhase::DayVote => resolution::resolve_day(&room.players, &game.actions)?,
        other => {
            return Err(GameError::InvariantViolation(format!(
                "nothing to resolve in {:?}",
                other
            )))
        }
    };
    let actions = game.actions.all();

    let casualties = outcome.casualties();
    for id in &casualties {
        let player = room.player_mut(id).ok_or_else(|| {
            GameError::InvariantViolation(format!("casualty {} is not seated", id))
        })?;
        player.kill();
    }
    let revealed = resolution::reveal_dead(&room.players, &casualties);

    let mut events = vec![Envelope::public(GameEvent::Resolution {
        deaths: outcome.deaths(),
        eliminated: outcome.eliminated(),
        redacted_roles: revealed.clone(),
    })];
    if let Outcome::Night { investigations, .. } = &outcome {
        for investigation in investigations {
            events.push(Envelope::private(
                investigation.detective_id.clone(),
                GameEvent::InvestigationResult {
                    target_id: investigation.target_id.clone(),
                    faction: investigation.faction,
                },
            ));
        }
    }

    let winner = resolution::check_winner(&room.players);
    let code = room.code.clone();
    let game = room
        .game
        .as_mut()
        .ok_or_else(|| GameError::GameNotFound(code.clone()))?;

    let previous = game
        .history()
        .last()
        .map(|e| e.audit_hash.clone())
        .unwrap_or_else(|| history_hash::GENESIS.to_string());
    let mut entry = HistoryEntry {
        sequence: game.history().len() as u32,
        day_number: game.day_number,
        phase_id: game.actions.phase_id(),
        actions,
        outcome,
        revealed,
        resolved_at: now,
        audit_hash: String::new(),
    };
    entry.audit_hash = history_hash::compute_entry_hash(&previous, &code, &entry);
    game.append_history(entry);

    if winner != Winner::None {
        game.winner = winner;
        events.push(enter(room, GamePhase::GameOver, now)?);
        events.push(Envelope::public(GameEvent::GameOver {
            winner,
            final_roles: resolution::final_roles(&room.players),
            error: false,
        }));
        info!("Game in room {} is over, winner {:?}", code, winner);
        return Ok(events);
    }

    let next = if resolving == GamePhase::NightAction {
        GamePhase::DayDiscussion
    } else {
        game.day_number += 1;
        GamePhase::NightAction
    };
    events.push(enter(room, next, now)?);
    Ok(events)
}

/// Ends a game whose state can no longer be trusted. Nobody wins.
fn corrupt(room: &mut Room, reason: &str, now: DateTime<Utc>) -> Vec<Envelope> {
    error!("Game in room {} corrupted: {}", room.code, reason);
    let Some(game) = room.game.as_mut() else {
        return Vec::new();
    };
    game.corrupted = true;
    game.winner = Winner::None;
    game.enter(GamePhase::GameOver, now);

    vec![
        Envelope::public(GameEvent::PhaseChanged {
            phase: GamePhase::GameOver,
            deadline: game.phase_deadline,
            day_number: game.day_number,
        }),
        Envelope::public(GameEvent::GameOver {
            winner: Winner::None,
            final_roles: resolution::final_roles(&room.players),
            error: true,
        }),
    ]
}

/// Drops any event that would show a role to someone not entitled to it.
/// Public events may only disclose dead players; private ones may in
/// addition disclose nothing beyond what the recipient's snapshot carries.
pub fn redact(room: &Room, events: Vec<Envelope>) -> Vec<Envelope> {
    events
        .into_iter()
        .filter(|envelope| {
            let leaked: Vec<&str> = envelope
                .event
                .disclosed_roles()
                .into_iter()
                .filter(|(id, _)| room.player(id).is_some_and(|p| p.alive))
                .map(|(id, _)| id)
                .collect();
            if leaked.is_empty() {
                return true;
            }
            let to = match &envelope.audience {
                Audience::Room => "room".to_string(),
                Audience::Player(id) => id.clone(),
            };
            warn!(
                "Dropped {} to {} in room {}: would reveal living players {:?}",
                envelope.event.name(),
                to,
                room.code,
                leaked
            );
            false
        })
        .collect()
}
