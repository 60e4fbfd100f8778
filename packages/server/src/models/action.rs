use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::game::GamePhase;
use super::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Kill,
    Heal,
    Investigate,
    Vote,
}

impl ActionKind {
    /// The only phase in which this kind of action is collected.
    pub fn accepting_phase(self) -> GamePhase {
        match self {
            ActionKind::Kill | ActionKind::Heal | ActionKind::Investigate => {
                GamePhase::NightAction
            }
            ActionKind::Vote => GamePhase::DayVote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub actor_id: PlayerId,
    pub kind: ActionKind,
    pub target_id: PlayerId,
    pub submitted_at: DateTime<Utc>,
    pub sequence: u64,
}

/// Acknowledgement handed back to the submitting actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accepted {
    pub actor_id: PlayerId,
    pub kind: ActionKind,
    pub target_id: PlayerId,
    pub phase_id: u64,
    pub replaced_previous: bool,
}

/// Live actions of a single phase instance, at most one per actor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionCollector {
    phase_id: u64,
    actions: Vec<Action>,
    next_sequence: u64,
}

impl ActionCollector {
    pub fn for_phase(phase_id: u64) -> Self {
        Self {
            phase_id,
            actions: Vec::new(),
            next_sequence: 0,
        }
    }

    pub fn phase_id(&self) -> u64 {
        self.phase_id
    }

    /// Stores the action, replacing any earlier one by the same actor.
    /// Callers validate first; this never fails.
    pub fn record(
        &mut self,
        actor_id: &str,
        kind: ActionKind,
        target_id: &str,
        submitted_at: DateTime<Utc>,
    ) -> Accepted {
        if let Some(existing) = self.actions.iter().find(|a| a.actor_id == actor_id) {
            // last write wins by submission time
            if submitted_at < existing.submitted_at {
                return Accepted {
                    actor_id: existing.actor_id.clone(),
                    kind: existing.kind,
                    target_id: existing.target_id.clone(),
                    phase_id: self.phase_id,
                    replaced_previous: false,
                };
            }
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let action = Action {
            actor_id: actor_id.to_string(),
            kind,
            target_id: target_id.to_string(),
            submitted_at,
            sequence,
        };

        let replaced_previous = match self.actions.iter_mut().find(|a| a.actor_id == actor_id) {
            Some(existing) => {
                *existing = action;
                true
            }
            None => {
                self.actions.push(action);
                false
            }
        };

        Accepted {
            actor_id: actor_id.to_string(),
            kind,
            target_id: target_id.to_string(),
            phase_id: self.phase_id,
            replaced_previous,
        }
    }

    /// Drops whatever the actor submitted in this phase.
    pub fn withdraw(&mut self, actor_id: &str) -> Option<Action> {
        let index = self.actions.iter().position(|a| a.actor_id == actor_id)?;
        Some(self.actions.remove(index))
    }

    pub fn action_of(&self, actor_id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.actor_id == actor_id)
    }

    pub fn has_submitted(&self, actor_id: &str, kind: ActionKind) -> bool {
        self.action_of(actor_id).is_some_and(|a| a.kind == kind)
    }

    /// Actions of one kind in submission order.
    pub fn of_kind(&self, kind: ActionKind) -> Vec<&Action> {
        let mut actions: Vec<&Action> = self.actions.iter().filter(|a| a.kind == kind).collect();
        actions.sort_by_key(|a| a.sequence);
        actions
    }

    pub fn all(&self) -> Vec<Action> {
        let mut actions = self.actions.clone();
        actions.sort_by_key(|a| a.sequence);
        actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
