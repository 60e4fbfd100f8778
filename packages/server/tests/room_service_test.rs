use std::time::Duration;

use mafia_server::{
    error::GameError,
    models::{
        action::ActionKind,
        config::GameConfig,
        event::GameEvent,
        game::GamePhase,
        player::ConnectionState,
        role::Role,
        room::{Departure, RoomStatus},
    },
    services::{broadcaster::RecordingBroadcaster, game_service, intent::Seat, room_service},
    state::AppState,
    utils::test_setup::{setup_test_env, test_config},
};

async fn lobby(state: &AppState, count: usize) -> (String, Vec<Seat>) {
    let code = room_service::create_room(state, Some("Test Room".to_string())).await;
    let mut seats = Vec::new();
    for i in 0..count {
        let (seat, _) = room_service::join_room(state, &code, &format!("Player{}", i))
            .await
            .unwrap();
        seats.push(seat);
    }
    (code, seats)
}

async fn settle(by: Duration) {
    tokio::time::sleep(by).await;
    tokio::task::yield_now().await;
}

#[tokio::test]
async fn test_join_is_rejected_once_full() {
    setup_test_env();
    let state = AppState::with_config(GameConfig {
        max_players: 5,
        ..test_config()
    });
    let (code, _) = lobby(&state, 5).await;

    assert_eq!(
        room_service::join_room(&state, &code, "late").await.err(),
        Some(GameError::RoomFull)
    );
}

#[tokio::test]
async fn test_join_after_start_without_spectators_is_rejected() {
    setup_test_env();
    let state = AppState::with_config(test_config());
    let (code, _) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    assert_eq!(
        room_service::join_room(&state, &code, "late").await.err(),
        Some(GameError::GameInProgress)
    );
    let info = room_service::get_room_info(&state, &code).await.unwrap();
    assert_eq!(info.status, RoomStatus::InProgress);
}

#[tokio::test]
async fn test_spectator_sees_only_public_events() {
    setup_test_env();
    let log = RecordingBroadcaster::new();
    let state = AppState::with_broadcaster(
        GameConfig {
            allow_spectators: true,
            ..test_config()
        },
        log.clone(),
    );
    let (code, _) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    let (spectator, snapshot) = room_service::join_room(&state, &code, "watcher").await.unwrap();
    assert!(snapshot.you.as_ref().unwrap().spectator);
    assert_eq!(snapshot.players.len(), 5);
    assert_eq!(snapshot.spectators, 1);

    let seen = log.visible_to(&code, Some(&spectator.player_id));
    assert!(!seen.is_empty());
    assert!(seen
        .iter()
        .all(|e| !matches!(e, GameEvent::StateSnapshot { .. } | GameEvent::ActionAccepted { .. })));
}

#[tokio::test]
async fn test_leave_in_lobby_frees_the_seat() {
    setup_test_env();
    let state = AppState::with_config(test_config());
    let (code, seats) = lobby(&state, 3).await;

    let departure = room_service::leave_room(&state, &seats[0]).await.unwrap();
    assert_eq!(departure, Departure::Removed);

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.host_id.as_ref(), Some(&seats[1].player_id));
}

#[tokio::test]
async fn test_leave_during_game_marks_absent() {
    setup_test_env();
    let state = AppState::with_config(test_config());
    let (code, seats) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    let departure = room_service::leave_room(&state, &seats[2]).await.unwrap();
    assert_eq!(departure, Departure::MarkedAbsent);

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    let view = &snapshot.players[2];
    assert!(view.alive);
    assert!(view.absent);

    // leaving is final, unlike a dropped connection
    assert!(matches!(
        room_service::reconnect(
            &state,
            &code,
            &seats[2].player_id,
            &seats[2].reconnect_token
        )
        .await,
        Err(GameError::ReconnectWindowClosed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_restores_the_player() {
    setup_test_env();
    let state = AppState::with_config(GameConfig {
        reconnect_grace: Duration::from_secs(30),
        ..test_config()
    });
    let (code, seats) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    room_service::disconnect(&state, &seats[1]).await.unwrap();
    settle(Duration::from_secs(10)).await;

    let (seat, snapshot) = room_service::reconnect(
        &state,
        &code,
        &seats[1].player_id,
        &seats[1].reconnect_token,
    )
    .await
    .unwrap();
    assert_eq!(seat, seats[1]);
    assert!(snapshot.you.as_ref().unwrap().role.is_some());
    assert_eq!(snapshot.phase, GamePhase::NightAction);

    // the cancelled grace timer must not mark the player absent later
    settle(Duration::from_secs(60)).await;
    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.players[1].connection, ConnectionState::Connected);
    assert!(!snapshot.players[1].absent);
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_in_game_blocks_reconnect() {
    setup_test_env();
    let state = AppState::with_config(GameConfig {
        reconnect_grace: Duration::from_secs(30),
        ..test_config()
    });
    let (code, seats) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    room_service::disconnect(&state, &seats[4]).await.unwrap();
    settle(Duration::from_secs(31)).await;

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert!(snapshot.players[4].absent);
    assert!(snapshot.players[4].alive);
    assert!(matches!(
        room_service::reconnect(
            &state,
            &code,
            &seats[4].player_id,
            &seats[4].reconnect_token
        )
        .await,
        Err(GameError::ReconnectWindowClosed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_in_lobby_removes_the_player() {
    setup_test_env();
    let state = AppState::with_config(GameConfig {
        reconnect_grace: Duration::from_secs(5),
        ..test_config()
    });
    let (code, seats) = lobby(&state, 2).await;

    room_service::disconnect(&state, &seats[1]).await.unwrap();
    settle(Duration::from_secs(6)).await;

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.players.len(), 1);
    assert_eq!(snapshot.players[0].id, seats[0].player_id);
}

#[tokio::test]
async fn test_reconnect_is_refused_for_a_connected_seat() {
    setup_test_env();
    let state = AppState::with_config(test_config());
    let (code, seats) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    assert!(matches!(
        room_service::reconnect(
            &state,
            &code,
            &seats[1].player_id,
            &seats[1].reconnect_token
        )
        .await,
        Err(GameError::AlreadyConnected(_))
    ));
}

#[tokio::test]
async fn test_reconnect_with_another_players_token_is_denied() {
    setup_test_env();
    let log = RecordingBroadcaster::new();
    let state = AppState::with_broadcaster(test_config(), log.clone());
    let (code, seats) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();
    room_service::disconnect(&state, &seats[1]).await.unwrap();
    log.clear();

    assert!(matches!(
        room_service::reconnect(
            &state,
            &code,
            &seats[1].player_id,
            &seats[2].reconnect_token
        )
        .await,
        Err(GameError::ReconnectDenied(_))
    ));
    assert!(log.events().is_empty());

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.players[1].connection, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_action_of_a_player_who_leaves_is_dropped() {
    setup_test_env();
    let state = AppState::with_config(test_config());
    let (code, seats) = lobby(&state, 5).await;
    game_service::start_game(&state, &code, None, None).await.unwrap();

    let (leader, victim) = {
        let shared = state.room(&code).await.unwrap();
        let slot = shared.lock().await;
        let players = &slot.room.players;
        let leader = players
            .iter()
            .position(|p| p.role == Some(Role::MafiaLeader))
            .unwrap();
        let victim = players
            .iter()
            .position(|p| p.role == Some(Role::Citizen))
            .unwrap();
        (leader, victim)
    };

    game_service::submit_action(
        &state,
        &code,
        &seats[leader].player_id,
        ActionKind::Kill,
        &seats[victim].player_id,
        None,
    )
    .await
    .unwrap();
    room_service::leave_room(&state, &seats[leader]).await.unwrap();

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.phase, GamePhase::NightAction);
    game_service::on_phase_deadline(&state, &code, snapshot.phase_id).await;

    let snapshot = game_service::snapshot_for(&state, &code, None).await.unwrap();
    assert_eq!(snapshot.phase, GamePhase::DayDiscussion);
    assert!(snapshot.players[victim].alive);
    assert!(snapshot.history[0].deaths.is_empty());
}

#[tokio::test]
async fn test_deleted_room_is_gone() {
    setup_test_env();
    let state = AppState::with_config(test_config());
    let (code, _) = lobby(&state, 2).await;

    room_service::delete_room(&state, &code).await.unwrap();
    assert!(matches!(
        game_service::snapshot_for(&state, &code, None).await,
        Err(GameError::RoomNotFound(_))
    ));
}
