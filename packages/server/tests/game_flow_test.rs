use std::sync::Arc;

use mafia_server::{
    models::{
        action::ActionKind,
        event::{Audience, GameEvent},
        game::{GamePhase, Winner},
        role::Role,
    },
    services::{
        broadcaster::RecordingBroadcaster,
        game_service::{self, SeatChange},
        intent::{Intent, Seat},
        room_service,
    },
    state::AppState,
    utils::test_setup::{setup_test_env, test_config},
};

struct Table {
    state: AppState,
    log: Arc<RecordingBroadcaster>,
    code: String,
    seats: Vec<Seat>,
}

impl Table {
    async fn new(names: &[&str]) -> Table {
        setup_test_env();
        let log = RecordingBroadcaster::new();
        let state = AppState::with_broadcaster(test_config(), log.clone());

        let reply = game_service::on_intent(
            &state,
            None,
            Intent::RoomCreate {
                name: names[0].to_string(),
            },
        )
        .await;
        let SeatChange::Take(host) = reply.seat else {
            panic!("room_create did not seat the host");
        };
        let code = host.room_code.clone();
        let mut seats = vec![host];

        for name in &names[1..] {
            let reply = game_service::on_intent(
                &state,
                None,
                Intent::RoomJoin {
                    room_code: code.clone(),
                    name: name.to_string(),
                },
            )
            .await;
            let SeatChange::Take(seat) = reply.seat else {
                panic!("{} could not join: {:?}", name, reply.replies);
            };
            seats.push(seat);
        }

        Table {
            state,
            log,
            code,
            seats,
        }
    }

    async fn send(&self, seat: usize, intent: Intent) -> Vec<GameEvent> {
        game_service::on_intent(&self.state, Some(&self.seats[seat]), intent)
            .await
            .replies
    }

    async fn seat_with(&self, role: Role) -> usize {
        let shared = self.state.room(&self.code).await.unwrap();
        let slot = shared.lock().await;
        slot.room
            .players
            .iter()
            .position(|p| p.role == Some(role))
            .unwrap()
    }

    async fn phase(&self) -> GamePhase {
        game_service::snapshot_for(&self.state, &self.code, None)
            .await
            .unwrap()
            .phase
    }

    fn id(&self, seat: usize) -> String {
        self.seats[seat].player_id.clone()
    }

    async fn night(&self, seat: usize, kind: ActionKind, target: usize) -> Vec<GameEvent> {
        self.send(
            seat,
            Intent::NightAction {
                kind,
                target_id: self.id(target),
                phase_id: None,
            },
        )
        .await
    }

    async fn vote(&self, seat: usize, target: usize) -> Vec<GameEvent> {
        self.send(
            seat,
            Intent::DayVote {
                target_id: self.id(target),
                phase_id: None,
            },
        )
        .await
    }

    async fn expire_current_phase(&self) {
        let snapshot = game_service::snapshot_for(&self.state, &self.code, None)
            .await
            .unwrap();
        game_service::on_phase_deadline(&self.state, &self.code, snapshot.phase_id).await;
    }
}

#[tokio::test]
async fn test_start_sends_each_player_only_their_own_role() {
    let table = Table::new(&["ann", "bob", "cat", "dan", "eve"]).await;
    table.log.clear();

    assert!(table.send(0, Intent::GameStart).await.is_empty());
    assert_eq!(table.phase().await, GamePhase::NightAction);

    for seat in &table.seats {
        let snapshots: Vec<_> = table
            .log
            .events()
            .into_iter()
            .filter(|(_, e)| e.audience == Audience::Player(seat.player_id.clone()))
            .filter_map(|(_, e)| match e.event {
                GameEvent::StateSnapshot { state } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots.len(), 1);
        let you = snapshots[0].you.as_ref().unwrap();
        assert_eq!(you.player_id, seat.player_id);
        assert!(you.role.is_some());
        assert!(snapshots[0].players.iter().all(|p| p.role.is_none()));
    }
}

#[tokio::test]
async fn test_full_game_town_wins_by_voting_out_the_leader() {
    let table = Table::new(&["ann", "bob", "cat", "dan", "eve"]).await;
    table.send(0, Intent::GameStart).await;

    let leader = table.seat_with(Role::MafiaLeader).await;
    let healer = table.seat_with(Role::Healer).await;
    let victim = (0..5).find(|s| *s != leader && *s != healer).unwrap();

    // night one: the heal lands on the kill target, nobody dies
    assert!(table.night(leader, ActionKind::Kill, victim).await.is_empty());
    table.night(healer, ActionKind::Heal, victim).await;
    assert_eq!(table.phase().await, GamePhase::DayDiscussion);

    table.expire_current_phase().await;
    assert_eq!(table.phase().await, GamePhase::DayVote);

    for seat in 0..5 {
        let target = if seat == leader { healer } else { leader };
        table.vote(seat, target).await;
    }

    let snapshot = game_service::snapshot_for(&table.state, &table.code, None)
        .await
        .unwrap();
    assert_eq!(snapshot.phase, GamePhase::GameOver);
    assert_eq!(snapshot.winner, Winner::Town);
    assert_eq!(snapshot.history.len(), 2);

    let over = table
        .log
        .public()
        .into_iter()
        .find(|e| e.name() == "game_over")
        .unwrap();
    match over {
        GameEvent::GameOver {
            winner,
            final_roles,
            error,
        } => {
            assert_eq!(winner, Winner::Town);
            assert!(!error);
            assert_eq!(final_roles.len(), 1);
            assert_eq!(final_roles[0].role, Role::MafiaLeader);
        }
        other => panic!("unexpected event {:?}", other),
    }

    // the game is over: every further action is a conflict
    let replies = table.vote(healer, victim).await;
    assert!(matches!(
        &replies[0],
        GameEvent::Rejected { code, .. } if code == "state_conflict"
    ));
}

#[tokio::test]
async fn test_no_public_event_reveals_a_living_role() {
    let table = Table::new(&["ann", "bob", "cat", "dan", "eve", "fay", "gus"]).await;
    table.send(0, Intent::GameStart).await;

    let leader = table.seat_with(Role::MafiaLeader).await;
    let healer = table.seat_with(Role::Healer).await;
    let town: Vec<usize> = (0..7).filter(|s| *s != leader && *s != healer).collect();

    // two rounds of night kills and tied or empty votes
    for round in 0..2 {
        table.night(leader, ActionKind::Kill, town[round]).await;
        table.night(healer, ActionKind::Heal, healer).await;
        table.expire_current_phase().await;
        table.expire_current_phase().await;
    }

    let shared = table.state.room(&table.code).await.unwrap();
    let slot = shared.lock().await;
    for (_, envelope) in table.log.events() {
        if envelope.audience != Audience::Room {
            continue;
        }
        for (id, _) in envelope.event.disclosed_roles() {
            let player = slot.room.player(id).unwrap();
            assert!(
                !player.alive,
                "{} disclosed the role of living player {}",
                envelope.event.name(),
                id
            );
        }
    }
}

#[tokio::test]
async fn test_action_acknowledgements_are_private() {
    let table = Table::new(&["ann", "bob", "cat", "dan", "eve"]).await;
    table.send(0, Intent::GameStart).await;
    let leader = table.seat_with(Role::MafiaLeader).await;
    let target = (0..5).find(|s| *s != leader).unwrap();
    table.log.clear();

    table.night(leader, ActionKind::Kill, target).await;

    let events = table.log.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1.audience, Audience::Player(table.id(leader)));
    assert_eq!(events[0].1.event.name(), "action_accepted");
    assert!(table
        .log
        .visible_to(&table.code, Some(&table.id(target)))
        .is_empty());
}

#[tokio::test]
async fn test_rejected_action_changes_nothing() {
    let table = Table::new(&["ann", "bob", "cat", "dan", "eve"]).await;
    table.send(0, Intent::GameStart).await;
    let leader = table.seat_with(Role::MafiaLeader).await;
    let citizen = table.seat_with(Role::Citizen).await;

    let before = {
        let shared = table.state.room(&table.code).await.unwrap();
        let slot = shared.lock().await;
        slot.room.clone()
    };
    table.log.clear();

    let replies = table.night(citizen, ActionKind::Kill, leader).await;
    assert!(matches!(
        &replies[0],
        GameEvent::Rejected { code, .. } if code == "role_not_authorized"
    ));
    let replies = table.vote(leader, citizen).await;
    assert!(matches!(
        &replies[0],
        GameEvent::Rejected { code, .. } if code == "wrong_phase"
    ));

    let shared = table.state.room(&table.code).await.unwrap();
    let slot = shared.lock().await;
    assert_eq!(slot.room, before);
    assert!(table.log.events().is_empty());
}

#[tokio::test]
async fn test_ai_players_fill_the_night() {
    setup_test_env();
    let log = RecordingBroadcaster::new();
    let mut config = test_config();
    config.ai_autoplay = true;
    let state = AppState::with_broadcaster(config, log.clone());

    let code = room_service::create_room(&state, None).await;
    let (host, _) = room_service::join_room(&state, &code, "ann").await.unwrap();
    for name in ["r1", "r2", "r3", "r4"] {
        room_service::add_ai(&state, &host, name).await.unwrap();
    }
    game_service::start_game(&state, &code, Some(&host.player_id), Some(21))
        .await
        .unwrap();

    let shared = state.room(&code).await.unwrap();
    let slot = shared.lock().await;
    let game = slot.room.game.as_ref().unwrap();
    let host_role = slot.room.player(&host.player_id).unwrap().role.unwrap();

    if host_role.gates_night() {
        // the human's input is still missing; every AI already acted
        assert_eq!(game.phase, GamePhase::NightAction);
        for ai in slot.room.players.iter().filter(|p| p.is_ai()) {
            let expects = ai.role.and_then(|r| r.night_action()).is_some();
            assert_eq!(game.actions.action_of(&ai.id).is_some(), expects);
        }
    } else {
        // AI covered every gating role, so night one resolved on its own
        assert!(matches!(
            game.phase,
            GamePhase::DayDiscussion | GamePhase::GameOver
        ));
        assert_eq!(game.history().len(), 1);
    }
}
