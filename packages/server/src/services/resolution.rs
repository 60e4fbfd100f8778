//! Deterministic outcome of a completed night or day vote.
//!
//! Nothing in here mutates a room. The phase machine applies the outcome,
//! appends it to the history and publishes its redacted summary.

use std::collections::HashMap;

use crate::error::{GameError, GameResult};
use crate::models::{
    action::{ActionCollector, ActionKind},
    game::Winner,
    history::{Investigation, Outcome, RevealedRole, VoteCount},
    player::Player,
    role::Faction,
};

fn alive_target<'a>(players: &'a [Player], target_id: &str) -> GameResult<&'a Player> {
    let target = players
        .iter()
        .find(|p| p.id == target_id)
        .ok_or_else(|| {
            GameError::InvariantViolation(format!("action targets unknown player {}", target_id))
        })?;
    if !target.alive {
        return Err(GameError::InvariantViolation(format!(
            "action targets dead player {}",
            target_id
        )));
    }
    Ok(target)
}

/// Only one kill lands per night. With several killers the first submitted kill
/// (lowest collector sequence) wins; the others are ignored.
pub fn resolve_night(players: &[Player], actions: &ActionCollector) -> GameResult<Outcome> {
    let kill = actions.of_kind(ActionKind::Kill).into_iter().next();
    let heals = actions.of_kind(ActionKind::Heal);

    let mut killed = None;
    let mut saved = None;
    if let Some(kill) = kill {
        let target = alive_target(players, &kill.target_id)?;
        if heals.iter().any(|h| h.target_id == target.id) {
            saved = Some(target.id.clone());
        } else {
            killed = Some(target.id.clone());
        }
    }

    let mut investigations = Vec::new();
    for action in actions.of_kind(ActionKind::Investigate) {
        let target = alive_target(players, &action.target_id)?;
        let role = target.role.ok_or_else(|| {
            GameError::InvariantViolation(format!("player {} has no role", target.id))
        })?;
        investigations.push(Investigation {
            detective_id: action.actor_id.clone(),
            target_id: target.id.clone(),
            faction: role.faction(),
        });
    }

    Ok(Outcome::Night {
        killed,
        saved,
        investigations,
    })
}

/// Strict plurality eliminates; a tie at the top eliminates nobody.
pub fn resolve_day(players: &[Player], actions: &ActionCollector) -> GameResult<Outcome> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for vote in actions.of_kind(ActionKind::Vote) {
        alive_target(players, &vote.target_id)?;
        let count = counts.entry(vote.target_id.as_str()).or_insert(0);
        if *count == 0 {
            order.push(vote.target_id.as_str());
        }
        *count += 1;
    }

    let mut tally: Vec<VoteCount> = order
        .iter()
        .map(|target| VoteCount {
            target_id: target.to_string(),
            votes: counts[target],
        })
        .collect();
    // stable: equal counts keep first-vote order
    tally.sort_by(|a, b| b.votes.cmp(&a.votes));

    let top = tally.first().map(|t| t.votes).unwrap_or(0);
    let leaders = tally.iter().filter(|t| t.votes == top).count();
    let tied = top > 0 && leaders > 1;
    let eliminated = if top > 0 && leaders == 1 {
        Some(tally[0].target_id.clone())
    } else {
        None
    };

    Ok(Outcome::Day {
        eliminated,
        tally,
        tied,
    })
}

/// Town wins once every mafia member is dead; mafia wins once it is at least
/// as large as the living town. Town is checked first.
pub fn check_winner(players: &[Player]) -> Winner {
    let mut mafia_alive = 0;
    let mut town_alive = 0;
    for player in players.iter().filter(|p| p.alive) {
        match player.role.map(|r| r.faction()) {
            Some(Faction::Mafia) => mafia_alive += 1,
            Some(Faction::Town) => town_alive += 1,
            None => {}
        }
    }

    if mafia_alive == 0 {
        Winner::Town
    } else if mafia_alive >= town_alive {
        Winner::Mafia
    } else {
        Winner::None
    }
}

/// Roles of the given players, provided they are dead. Living players are
/// silently skipped so a caller can never reveal one by mistake.
pub fn reveal_dead(players: &[Player], ids: &[String]) -> Vec<RevealedRole> {
    ids.iter()
        .filter_map(|id| players.iter().find(|p| &p.id == id))
        .filter(|p| !p.alive)
        .filter_map(|p| {
            p.role.map(|role| RevealedRole {
                player_id: p.id.clone(),
                role,
            })
        })
        .collect()
}

/// Final roles announced at game over: every dead player, in seat order.
pub fn final_roles(players: &[Player]) -> Vec<RevealedRole> {
    let dead: Vec<String> = players
        .iter()
        .filter(|p| !p.alive)
        .map(|p| p.id.clone())
        .collect();
    reveal_dead(players, &dead)
}
