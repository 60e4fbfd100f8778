use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    ai,
    intent::{Intent, Seat},
    phase_machine, room_service, snapshot,
    timer::TimerKey,
};
use crate::{
    error::{GameError, GameResult},
    models::{
        action::{Accepted, ActionKind},
        event::{Envelope, GameEvent, GameSnapshot},
        history::PublicHistoryEntry,
        player::Player,
        room::Room,
    },
    state::{AppState, RoomSlot},
};

/// Hands events to the broadcaster in order, after the redaction check.
/// Callers hold the room lock so events of one room never interleave.
pub(crate) fn publish(state: &AppState, room: &Room, events: Vec<Envelope>) {
    for envelope in phase_machine::redact(room, events) {
        debug!("Room {}: {}", room.code, envelope.event.name());
        state.broadcaster.emit(&room.code, envelope);
    }
}

/// Common tail of every transition: let AI players act, publish, and point
/// the phase timer at the phase the room ended up in.
fn settle(state: &AppState, slot: &mut RoomSlot, mut events: Vec<Envelope>, now: DateTime<Utc>) {
    if state.config.ai_autoplay {
        events.extend(ai::drive(&mut slot.room, &mut slot.rng, now));
    }
    publish(state, &slot.room, events);
    schedule_phase_timer(state, &slot.room);
}

fn schedule_phase_timer(state: &AppState, room: &Room) {
    let key = TimerKey::Phase(room.code.clone());
    let Some((phase_id, deadline)) = phase_machine::timed_phase(room) else {
        state.timers.cancel(&key);
        return;
    };

    let delay = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    let task_state = state.clone();
    let room_code = room.code.clone();
    state.timers.schedule(key, delay, async move {
        on_phase_deadline(&task_state, &room_code, phase_id).await;
    });
}

pub async fn start_game(
    state: &AppState,
    room_code: &str,
    actor_id: Option<&str>,
    seed: Option<u64>,
) -> GameResult<()> {
    let shared = state.room(room_code).await?;
    let mut guard = shared.lock().await;
    let slot = &mut *guard;

    if let Some(seed) = seed {
        slot.rng = StdRng::seed_from_u64(seed);
    }
    let now = Utc::now();
    let events =
        phase_machine::start_game(&mut slot.room, &state.config, actor_id, &mut slot.rng, now)?;
    settle(state, slot, events, now);
    Ok(())
}

pub async fn submit_action(
    state: &AppState,
    room_code: &str,
    actor_id: &str,
    kind: ActionKind,
    target_id: &str,
    phase_id: Option<u64>,
) -> GameResult<Accepted> {
    let shared = state.room(room_code).await?;
    let mut guard = shared.lock().await;
    let slot = &mut *guard;

    let now = Utc::now();
    let (accepted, events) =
        phase_machine::submit_action(&mut slot.room, actor_id, kind, target_id, phase_id, now)?;
    debug!(
        "Room {}: {} submitted {:?} on {}",
        room_code, actor_id, kind, target_id
    );
    settle(state, slot, events, now);
    Ok(accepted)
}

/// Phase timer callback.
pub async fn on_phase_deadline(state: &AppState, room_code: &str, phase_id: u64) {
    let Ok(shared) = state.room(room_code).await else {
        return;
    };
    let mut guard = shared.lock().await;
    let slot = &mut *guard;

    let now = Utc::now();
    let events = phase_machine::on_deadline(&mut slot.room, phase_id, now);
    if events.is_empty() {
        debug!("Room {}: stale timer for phase {}", room_code, phase_id);
        return;
    }
    settle(state, slot, events, now);
}

pub async fn snapshot_for(
    state: &AppState,
    room_code: &str,
    viewer: Option<&str>,
) -> GameResult<GameSnapshot> {
    let shared = state.room(room_code).await?;
    let slot = shared.lock().await;
    Ok(snapshot::build(&slot.room, viewer))
}

pub async fn get_history(state: &AppState, room_code: &str) -> GameResult<Vec<PublicHistoryEntry>> {
    let shared = state.room(room_code).await?;
    let slot = shared.lock().await;
    let game = slot
        .room
        .game
        .as_ref()
        .ok_or_else(|| GameError::GameNotFound(room_code.to_string()))?;
    Ok(game.history().iter().map(PublicHistoryEntry::from).collect())
}

/// Result of one intent: events for the sender alone, and the seat the
/// connection holds afterwards when it changed.
#[derive(Debug, Default)]
pub struct IntentReply {
    pub seat: SeatChange,
    pub replies: Vec<GameEvent>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum SeatChange {
    #[default]
    Keep,
    Take(Seat),
    Release,
}

impl IntentReply {
    fn reply(event: GameEvent) -> Self {
        IntentReply {
            seat: SeatChange::Keep,
            replies: vec![event],
        }
    }

    fn seated(seat: Seat, events: Vec<GameEvent>) -> Self {
        IntentReply {
            seat: SeatChange::Take(seat),
            replies: events,
        }
    }
}

pub fn rejection(error: &GameError) -> GameEvent {
    GameEvent::Rejected {
        code: error.code().to_string(),
        reason: error.to_string(),
    }
}

/// Routes one inbound intent from a connection currently holding `seat`.
/// Failures become a `rejected` reply to the sender; nothing else sees them.
pub async fn on_intent(state: &AppState, seat: Option<&Seat>, intent: Intent) -> IntentReply {
    let name = intent.name();
    match dispatch(state, seat, intent).await {
        Ok(reply) => reply,
        Err(error) => {
            if let GameError::InvariantViolation(_) = error {
                warn!("Intent {} failed: {}", name, error);
            } else {
                debug!("Intent {} rejected: {}", name, error);
            }
            let mut reply = IntentReply::reply(rejection(&error));
            // a client acting on an old phase needs the current one
            if let (GameError::StateConflict { .. }, Some(seat)) = (&error, seat) {
                if let Ok(state) =
                    snapshot_for(state, &seat.room_code, Some(&seat.player_id)).await
                {
                    reply.replies.push(GameEvent::StateSnapshot { state });
                }
            }
            reply
        }
    }
}

async fn dispatch(state: &AppState, seat: Option<&Seat>, intent: Intent) -> GameResult<IntentReply> {
    if seat.is_none() && intent.needs_seat() {
        return Err(GameError::NotInRoom);
    }

    match intent {
        Intent::RoomCreate { name } => {
            if seat.is_some() {
                return Err(GameError::MalformedIntent(
                    "leave the current room first".to_string(),
                ));
            }
            let code = room_service::create_room(state, None).await;
            let (seat, snapshot) = room_service::join_room(state, &code, &name).await?;
            Ok(IntentReply::seated(
                seat.clone(),
                vec![
                    GameEvent::RoomCreated {
                        room_code: seat.room_code,
                        player_id: seat.player_id,
                        reconnect_token: seat.reconnect_token,
                    },
                    GameEvent::StateSnapshot { state: snapshot },
                ],
            ))
        }
        Intent::RoomJoin { room_code, name } => {
            if seat.is_some() {
                return Err(GameError::MalformedIntent(
                    "leave the current room first".to_string(),
                ));
            }
            let (seat, snapshot) = room_service::join_room(state, &room_code, &name).await?;
            Ok(IntentReply::seated(
                seat.clone(),
                vec![
                    GameEvent::RoomJoined {
                        room_code: seat.room_code,
                        player_id: seat.player_id,
                        reconnect_token: seat.reconnect_token,
                    },
                    GameEvent::StateSnapshot { state: snapshot },
                ],
            ))
        }
        Intent::Reconnect {
            room_code,
            player_id,
            reconnect_token,
        } => {
            if seat.is_some() {
                return Err(GameError::MalformedIntent(
                    "leave the current room first".to_string(),
                ));
            }
            let (seat, snapshot) =
                room_service::reconnect(state, &room_code, &player_id, &reconnect_token).await?;
            Ok(IntentReply::seated(
                seat,
                vec![GameEvent::StateSnapshot { state: snapshot }],
            ))
        }
        Intent::RoomLeave => {
            let seat = seat.ok_or(GameError::NotInRoom)?;
            room_service::leave_room(state, seat).await?;
            Ok(IntentReply {
                seat: SeatChange::Release,
                replies: Vec::new(),
            })
        }
        Intent::AddAi { name } => {
            let seat = seat.ok_or(GameError::NotInRoom)?;
            room_service::add_ai(state, seat, &name).await?;
            Ok(IntentReply::default())
        }
        Intent::GameStart => {
            let seat = seat.ok_or(GameError::NotInRoom)?;
            start_game(state, &seat.room_code, Some(&seat.player_id), None).await?;
            info!(
                "Player {} started the game in room {}",
                seat.player_id, seat.room_code
            );
            Ok(IntentReply::default())
        }
        Intent::NightAction {
            kind,
            target_id,
            phase_id,
        } => {
            let seat = seat.ok_or(GameError::NotInRoom)?;
            if kind == ActionKind::Vote {
                return Err(GameError::MalformedIntent(
                    "votes are cast with day_vote".to_string(),
                ));
            }
            submit_action(
                state,
                &seat.room_code,
                &seat.player_id,
                kind,
                &target_id,
                phase_id,
            )
            .await?;
            Ok(IntentReply::default())
        }
        Intent::DayVote {
            target_id,
            phase_id,
        } => {
            let seat = seat.ok_or(GameError::NotInRoom)?;
            submit_action(
                state,
                &seat.room_code,
                &seat.player_id,
                ActionKind::Vote,
                &target_id,
                phase_id,
            )
            .await?;
            Ok(IntentReply::default())
        }
        Intent::RequestSnapshot => {
            let seat = seat.ok_or(GameError::NotInRoom)?;
            let snapshot = snapshot_for(state, &seat.room_code, Some(&seat.player_id)).await?;
            Ok(IntentReply::reply(GameEvent::StateSnapshot { state: snapshot }))
        }
    }
}

/// Seats players directly, bypassing sockets. Used by tests and tooling.
pub async fn seat_players(
    state: &AppState,
    room_code: &str,
    players: Vec<Player>,
) -> GameResult<()> {
    let shared = state.room(room_code).await?;
    let mut slot = shared.lock().await;
    let now = Utc::now();
    for player in players {
        slot.room.join(player, now)?;
    }
    Ok(())
}
