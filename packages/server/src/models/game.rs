use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::action::ActionCollector;
use super::history::HistoryEntry;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Lobby,
    NightAction,
    DayDiscussion,
    DayVote,
    Resolution,
    GameOver,
}

impl GamePhase {
    /// Phases that end on a timer.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            GamePhase::NightAction | GamePhase::DayDiscussion | GamePhase::DayVote
        )
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    None,
    Mafia,
    Town,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameRules {
    pub night_duration: Duration,
    pub discussion_duration: Duration,
    pub vote_duration: Duration,
    pub allow_self_heal: bool,
    pub allow_self_vote: bool,
}

impl GameRules {
    pub fn duration_of(&self, phase: GamePhase) -> Duration {
        match phase {
            GamePhase::NightAction => self.night_duration,
            GamePhase::DayDiscussion => self.discussion_duration,
            GamePhase::DayVote => self.vote_duration,
            GamePhase::Lobby | GamePhase::Resolution | GamePhase::GameOver => Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Game {
    pub phase: GamePhase,
    pub phase_id: u64,
    pub phase_deadline: DateTime<Utc>,
    pub day_number: u32,
    pub winner: Winner,
    pub corrupted: bool,
    pub rules: GameRules,
    pub actions: ActionCollector,
    history: Vec<HistoryEntry>,
}

impl Game {
    pub fn new(rules: GameRules, now: DateTime<Utc>) -> Self {
        Game {
            phase: GamePhase::Lobby,
            phase_id: 0,
            phase_deadline: now,
            day_number: 0,
            winner: Winner::None,
            corrupted: false,
            rules,
            actions: ActionCollector::for_phase(0),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub(crate) fn append_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Moves to `phase`, opening a new phase instance. The deadline always
    /// moves strictly forward, even for zero-length phases.
    pub fn enter(&mut self, phase: GamePhase, now: DateTime<Utc>) {
        let length = chrono::Duration::from_std(self.rules.duration_of(phase))
            .unwrap_or_else(|_| chrono::Duration::zero());
        let candidate = now + length;
        self.phase_deadline = if candidate > self.phase_deadline {
            candidate
        } else {
            self.phase_deadline + chrono::Duration::milliseconds(1)
        };
        self.phase = phase;
        self.phase_id += 1;
        if matches!(phase, GamePhase::NightAction | GamePhase::DayVote) {
            self.actions = ActionCollector::for_phase(self.phase_id);
        }
    }
}
