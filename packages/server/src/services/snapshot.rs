use crate::models::{
    event::{GameSnapshot, PendingAction, PlayerView, ViewerState},
    game::{GamePhase, Winner},
    history::PublicHistoryEntry,
    player::Player,
    room::Room,
};

fn view_of(player: &Player) -> PlayerView {
    PlayerView {
        id: player.id.clone(),
        name: player.name.clone(),
        kind: player.kind,
        alive: player.alive,
        connection: player.connection,
        absent: player.grace_expired,
        role: if player.alive { None } else { player.role },
    }
}

/// Full room state as `viewer` is allowed to see it. Roles of living players
/// never appear except the viewer's own, under `you`.
pub fn build(room: &Room, viewer: Option<&str>) -> GameSnapshot {
    let game = room.game.as_ref();

    let you = viewer.and_then(|id| {
        if let Some(player) = room.player(id) {
            let pending_action = game
                .filter(|g| matches!(g.phase, GamePhase::NightAction | GamePhase::DayVote))
                .and_then(|g| g.actions.action_of(id))
                .map(|a| PendingAction {
                    kind: a.kind,
                    target_id: a.target_id.clone(),
                });
            Some(ViewerState {
                player_id: player.id.clone(),
                spectator: false,
                role: player.role,
                pending_action,
            })
        } else {
            room.spectator(id).map(|s| ViewerState {
                player_id: s.id.clone(),
                spectator: true,
                role: None,
                pending_action: None,
            })
        }
    });

    GameSnapshot {
        room_code: room.code.clone(),
        host_id: room.host_id.clone(),
        phase: room.phase(),
        phase_id: game.map(|g| g.phase_id).unwrap_or(0),
        deadline: game
            .filter(|g| g.phase.is_timed())
            .map(|g| g.phase_deadline),
        day_number: game.map(|g| g.day_number).unwrap_or(0),
        winner: game.map(|g| g.winner).unwrap_or(Winner::None),
        corrupted: game.map(|g| g.corrupted).unwrap_or(false),
        players: room.players.iter().map(view_of).collect(),
        spectators: room.spectators.len(),
        history: game
            .map(|g| g.history().iter().map(PublicHistoryEntry::from).collect())
            .unwrap_or_default(),
        you,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{player::Player, role::Role};
    use chrono::Utc;

    fn lobby() -> Room {
        let mut room = Room::new("SNAP01".to_string(), None, 8, true, Utc::now());
        for name in ["a", "b", "c"] {
            room.join(Player::human(name), Utc::now()).unwrap();
        }
        room
    }

    #[test]
    fn living_roles_are_hidden_except_the_viewers_own() {
        let mut room = lobby();
        room.players[0].role = Some(Role::MafiaLeader);
        room.players[1].role = Some(Role::Healer);
        room.players[2].role = Some(Role::Citizen);
        room.players[2].kill();

        let viewer = room.players[1].id.clone();
        let snapshot = build(&room, Some(&viewer));

        assert_eq!(snapshot.players[0].role, None);
        assert_eq!(snapshot.players[1].role, None);
        assert_eq!(snapshot.players[2].role, Some(Role::Citizen));
        assert_eq!(snapshot.you.unwrap().role, Some(Role::Healer));
    }

    #[test]
    fn anonymous_snapshot_has_no_viewer_section() {
        let room = lobby();
        let snapshot = build(&room, None);

        assert!(snapshot.you.is_none());
        assert_eq!(snapshot.phase, GamePhase::Lobby);
        assert_eq!(snapshot.deadline, None);
        assert_eq!(snapshot.host_id.as_ref(), Some(&room.players[0].id));
    }
}
