//! Server-driven players. An AI picks a random legal target for its role as
//! soon as an action phase opens and submits through the same path as a human.

use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use tracing::debug;

use super::phase_machine;
use crate::models::{
    action::ActionKind,
    event::Envelope,
    game::GamePhase,
    player::{Player, PlayerId},
    role::Faction,
    room::Room,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub actor_id: PlayerId,
    pub kind: ActionKind,
    pub target_id: PlayerId,
}

fn candidates<'a>(room: &'a Room, actor: &Player, kind: ActionKind) -> Vec<&'a Player> {
    let rules = room.game.as_ref().map(|g| &g.rules);
    let faction = actor.role.map(|r| r.faction());
    room.alive_players()
        .filter(|p| {
            let is_self = p.id == actor.id;
            match kind {
                // never a fellow mafia member
                ActionKind::Kill => {
                    !is_self && p.role.map(|r| r.faction()) != Some(Faction::Mafia)
                }
                ActionKind::Heal => !is_self || rules.is_some_and(|r| r.allow_self_heal),
                ActionKind::Investigate => !is_self,
                ActionKind::Vote => {
                    !is_self
                        && !(faction == Some(Faction::Mafia)
                            && p.role.map(|r| r.faction()) == Some(Faction::Mafia))
                }
            }
        })
        .collect()
}

/// One action for every living AI that has not acted in the current phase.
pub fn plan<R: Rng + ?Sized>(room: &Room, rng: &mut R) -> Vec<PlannedAction> {
    let Some(game) = room.game.as_ref() else {
        return Vec::new();
    };

    let mut planned = Vec::new();
    for actor in room.alive_players().filter(|p| p.is_ai()) {
        if game.actions.action_of(&actor.id).is_some() {
            continue;
        }
        let kind = match game.phase {
            GamePhase::NightAction => match actor.role.and_then(|r| r.night_action()) {
                Some(kind) => kind,
                None => continue,
            },
            GamePhase::DayVote => ActionKind::Vote,
            _ => return Vec::new(),
        };
        if let Some(target) = candidates(room, actor, kind).choose(rng) {
            planned.push(PlannedAction {
                actor_id: actor.id.clone(),
                kind,
                target_id: target.id.clone(),
            });
        }
    }
    planned
}

/// Lets every AI act, following the game through as many phases as AI input
/// alone completes.
pub fn drive<R: Rng + ?Sized>(room: &mut Room, rng: &mut R, now: DateTime<Utc>) -> Vec<Envelope> {
    let mut events = Vec::new();
    loop {
        let Some(phase_id) = room.game.as_ref().map(|g| g.phase_id) else {
            break;
        };
        let planned = plan(room, rng);
        if planned.is_empty() {
            break;
        }
        for action in planned {
            match phase_machine::submit_action(
                room,
                &action.actor_id,
                action.kind,
                &action.target_id,
                Some(phase_id),
                now,
            ) {
                Ok((_, more)) => events.extend(more),
                Err(e) => {
                    debug!("AI {} skipped {:?}: {}", action.actor_id, action.kind, e);
                    break;
                }
            }
        }
        if room.game.as_ref().map(|g| g.phase_id) == Some(phase_id) {
            break;
        }
    }
    events
}
