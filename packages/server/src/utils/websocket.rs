use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::GameError;
use crate::models::event::{Envelope, GameEvent};
use crate::services::{
    game_service::{self, SeatChange},
    intent::{Intent, Seat},
    room_service,
};
use crate::state::AppState;
use crate::utils::room_code;

/// Instructions from the receiving half to the sending half of one socket.
enum Outbound {
    Reply(GameEvent),
    Seated(Seat, broadcast::Receiver<Envelope>),
    Unseated,
}

pub async fn handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<Envelope>>,
) -> Result<Envelope, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn resync(state: &AppState, seat: Option<&Seat>) -> Option<GameEvent> {
    let seat = seat?;
    game_service::snapshot_for(state, &seat.room_code, Some(&seat.player_id))
        .await
        .ok()
        .map(|state| GameEvent::StateSnapshot { state })
}

pub async fn handle_socket(ws: WebSocket, state: AppState) {
    info!("New WebSocket connection established");
    let (mut sender, mut receiver) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let send_state = state.clone();
    let send_task = tokio::spawn(async move {
        let mut seat: Option<Seat> = None;
        let mut events: Option<broadcast::Receiver<Envelope>> = None;

        loop {
            let outgoing = tokio::select! {
                // direct replies first so a join's own answer precedes room traffic
                biased;
                command = rx.recv() => match command {
                    None => break,
                    Some(Outbound::Reply(event)) => event,
                    Some(Outbound::Seated(new_seat, receiver)) => {
                        seat = Some(new_seat);
                        events = Some(receiver);
                        continue;
                    }
                    Some(Outbound::Unseated) => {
                        seat = None;
                        events = None;
                        continue;
                    }
                },
                received = next_event(&mut events) => match received {
                    Ok(envelope) => {
                        let viewer = seat.as_ref().map(|s| s.player_id.as_str());
                        if !envelope.is_visible_to(viewer) {
                            continue;
                        }
                        envelope.event
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Socket lagged by {} events, resynchronising", skipped);
                        match resync(&send_state, seat.as_ref()).await {
                            Some(event) => event,
                            None => continue,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events = None;
                        continue;
                    }
                },
            };

            let text = match serde_json::to_string(&outgoing) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize {}: {}", outgoing.name(), e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                debug!("Error sending message: {}", e);
                break;
            }
        }
    });

    let recv_state = state.clone();
    let receive_task = tokio::spawn(async move {
        let mut seat: Option<Seat> = None;

        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let intent = match serde_json::from_str::<Intent>(&text) {
                Ok(intent) => intent,
                Err(e) => {
                    let error = GameError::MalformedIntent(e.to_string());
                    let _ = tx.send(Outbound::Reply(game_service::rejection(&error)));
                    continue;
                }
            };

            // subscribe before joining so nothing published after the join is missed
            let early = match &intent {
                Intent::RoomJoin { room_code, .. } | Intent::Reconnect { room_code, .. } => {
                    recv_state.hub.subscribe(&room_code::normalize(room_code))
                }
                _ => None,
            };

            let reply = game_service::on_intent(&recv_state, seat.as_ref(), intent).await;
            match reply.seat {
                SeatChange::Keep => {}
                SeatChange::Take(new_seat) => {
                    let events = early.or_else(|| recv_state.hub.subscribe(&new_seat.room_code));
                    if let Some(events) = events {
                        let _ = tx.send(Outbound::Seated(new_seat.clone(), events));
                    }
                    seat = Some(new_seat);
                }
                SeatChange::Release => {
                    seat = None;
                    let _ = tx.send(Outbound::Unseated);
                }
            }
            for event in reply.replies {
                let _ = tx.send(Outbound::Reply(event));
            }
        }
        seat
    });

    let seat = receive_task.await.unwrap_or(None);
    send_task.abort();

    if let Some(seat) = seat {
        info!(
            "WebSocket closed for player {} in room {}",
            seat.player_id, seat.room_code
        );
        if let Err(e) = room_service::disconnect(&state, &seat).await {
            debug!("Disconnect of {} ignored: {}", seat.player_id, e);
        }
    }
}
