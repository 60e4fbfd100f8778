use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    game_service::publish,
    intent::Seat,
    snapshot,
    timer::TimerKey,
};
use crate::{
    error::{GameError, GameResult},
    models::{
        event::{Envelope, GameEvent, GameSnapshot, PlayerView},
        player::{ConnectionState, Player},
        room::{Departure, Room, RoomSummary},
    },
    state::{AppState, RoomSlot},
    utils::room_code,
};

fn player_view(player: &Player) -> PlayerView {
    PlayerView {
        id: player.id.clone(),
        name: player.name.clone(),
        kind: player.kind,
        alive: player.alive,
        connection: player.connection,
        absent: player.grace_expired,
        role: None,
    }
}

pub async fn create_room(state: &AppState, name: Option<String>) -> String {
    let now = Utc::now();
    let mut rng = state.new_rng(None);
    let mut rooms = state.rooms.lock().await;

    let mut code = room_code::generate(&mut rng);
    while rooms.contains_key(&code) {
        code = room_code::generate(&mut rng);
    }

    let room = Room::new(
        code.clone(),
        name,
        state.config.max_players,
        state.config.allow_spectators,
        now,
    );
    let slot = RoomSlot {
        room,
        rng: state.new_rng(None),
    };
    rooms.insert(code.clone(), Arc::new(Mutex::new(slot)));
    state.hub.get_or_create_room_channel(&code);

    info!("Room {} created", code);
    code
}

/// Seats a new human. Once the game runs this makes a spectator instead, if
/// the room allows them.
pub async fn join_room(
    state: &AppState,
    room_code: &str,
    name: &str,
) -> GameResult<(Seat, GameSnapshot)> {
    let code = room_code::normalize(room_code);
    let shared = state.room(&code).await?;
    let mut slot = shared.lock().await;
    let room = &mut slot.room;

    let player = Player::human(name.trim());
    let view = player_view(&player);
    let joined = room.join(player, Utc::now())?;

    publish(
        state,
        room,
        vec![Envelope::public(GameEvent::PlayerJoined {
            player: view,
            spectator: joined.spectator,
        })],
    );
    info!(
        "{} {} joined room {}",
        if joined.spectator { "Spectator" } else { "Player" },
        joined.player_id,
        code
    );

    let snapshot = snapshot::build(room, Some(&joined.player_id));
    Ok((
        Seat {
            room_code: code,
            player_id: joined.player_id,
            reconnect_token: joined.reconnect_token,
        },
        snapshot,
    ))
}

/// Lobby only, host only.
pub async fn add_ai(state: &AppState, seat: &Seat, name: &str) -> GameResult<String> {
    let shared = state.room(&seat.room_code).await?;
    let mut slot = shared.lock().await;
    let room = &mut slot.room;

    if room.has_started() {
        return Err(GameError::GameInProgress);
    }
    if room.player(&seat.player_id).is_none() {
        return Err(GameError::NotInRoom);
    }
    if !room.is_host(&seat.player_id) {
        return Err(GameError::NotHost);
    }

    let player = Player::ai(name.trim());
    let view = player_view(&player);
    let joined = room.join(player, Utc::now())?;
    publish(
        state,
        room,
        vec![Envelope::public(GameEvent::PlayerJoined {
            player: view,
            spectator: false,
        })],
    );
    info!("AI {} added to room {}", joined.player_id, seat.room_code);
    Ok(joined.player_id)
}

pub async fn leave_room(state: &AppState, seat: &Seat) -> GameResult<Departure> {
    let shared = state.room(&seat.room_code).await?;
    let mut slot = shared.lock().await;
    let room = &mut slot.room;

    let departure = room.leave(&seat.player_id, Utc::now())?;
    state.timers.cancel(&TimerKey::Grace(
        seat.room_code.clone(),
        seat.player_id.clone(),
    ));
    publish(
        state,
        room,
        vec![Envelope::public(GameEvent::PlayerLeft {
            player_id: seat.player_id.clone(),
        })],
    );
    info!(
        "Player {} left room {} ({:?})",
        seat.player_id, seat.room_code, departure
    );
    Ok(departure)
}

/// Transport closed. The player keeps their seat for the grace period.
pub async fn disconnect(state: &AppState, seat: &Seat) -> GameResult<()> {
    let shared = state.room(&seat.room_code).await?;
    let mut slot = shared.lock().await;
    let room = &mut slot.room;

    let since = room.disconnect(&seat.player_id, Utc::now())?;
    publish(
        state,
        room,
        vec![Envelope::public(GameEvent::PlayerConnection {
            player_id: seat.player_id.clone(),
            connection: ConnectionState::Disconnected,
        })],
    );

    let task_state = state.clone();
    let task_seat = seat.clone();
    state.timers.schedule(
        TimerKey::Grace(seat.room_code.clone(), seat.player_id.clone()),
        state.config.reconnect_grace,
        async move {
            expire_grace(&task_state, &task_seat, since).await;
        },
    );
    debug!(
        "Player {} disconnected from room {}, grace {:?}",
        seat.player_id, seat.room_code, state.config.reconnect_grace
    );
    Ok(())
}

pub async fn reconnect(
    state: &AppState,
    room_code: &str,
    player_id: &str,
    reconnect_token: &str,
) -> GameResult<(Seat, GameSnapshot)> {
    let code = room_code::normalize(room_code);
    let shared = state.room(&code).await?;
    let mut slot = shared.lock().await;
    let room = &mut slot.room;

    room.reconnect(player_id, reconnect_token, Utc::now())?;
    state
        .timers
        .cancel(&TimerKey::Grace(code.clone(), player_id.to_string()));
    publish(
        state,
        room,
        vec![Envelope::public(GameEvent::PlayerConnection {
            player_id: player_id.to_string(),
            connection: ConnectionState::Connected,
        })],
    );
    info!("Player {} reconnected to room {}", player_id, code);

    let snapshot = snapshot::build(room, Some(player_id));
    Ok((
        Seat {
            room_code: code,
            player_id: player_id.to_string(),
            reconnect_token: reconnect_token.to_string(),
        },
        snapshot,
    ))
}

async fn expire_grace(state: &AppState, seat: &Seat, since: DateTime<Utc>) {
    let Ok(shared) = state.room(&seat.room_code).await else {
        return;
    };
    let mut slot = shared.lock().await;
    let room = &mut slot.room;

    if let Some(departure) = room.expire_grace(&seat.player_id, since, Utc::now()) {
        info!(
            "Grace period over for player {} in room {} ({:?})",
            seat.player_id, seat.room_code, departure
        );
        publish(
            state,
            room,
            vec![Envelope::public(GameEvent::PlayerLeft {
                player_id: seat.player_id.clone(),
            })],
        );
    }
}

pub async fn get_rooms(state: &AppState) -> Vec<RoomSummary> {
    let shared: Vec<_> = state.rooms.lock().await.values().cloned().collect();
    let mut rooms = Vec::with_capacity(shared.len());
    for slot in shared {
        rooms.push(slot.lock().await.room.summary());
    }
    rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    rooms
}

pub async fn get_room_info(state: &AppState, room_code: &str) -> GameResult<RoomSummary> {
    let shared = state.room(&room_code::normalize(room_code)).await?;
    let summary = shared.lock().await.room.summary();
    Ok(summary)
}

pub async fn delete_room(state: &AppState, room_code: &str) -> GameResult<()> {
    let code = room_code::normalize(room_code);
    state
        .rooms
        .lock()
        .await
        .remove(&code)
        .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;
    state.timers.cancel_room(&code);
    state.hub.close_room(&code);
    info!("Room {} deleted", code);
    Ok(())
}

/// Removes rooms nobody can come back to and that saw no activity for the
/// configured idle time. Returns the removed codes.
pub async fn sweep_idle_rooms(state: &AppState, now: DateTime<Utc>) -> Vec<String> {
    let idle_ttl = chrono::Duration::from_std(state.config.room_idle_ttl)
        .unwrap_or_else(|_| chrono::Duration::zero());
    let shared: Vec<(String, _)> = state
        .rooms
        .lock()
        .await
        .iter()
        .map(|(code, slot)| (code.clone(), slot.clone()))
        .collect();

    let mut removed = Vec::new();
    for (code, slot) in shared {
        let slot = slot.lock().await;
        if slot.room.is_collectable() && now - slot.room.last_activity >= idle_ttl {
            removed.push(code);
        }
    }

    if !removed.is_empty() {
        let mut rooms = state.rooms.lock().await;
        for code in &removed {
            rooms.remove(code);
            state.timers.cancel_room(code);
            state.hub.close_room(code);
        }
        info!("Swept {} idle rooms", removed.len());
    }
    removed
}
