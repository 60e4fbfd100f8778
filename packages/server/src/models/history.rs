use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::Action;
use super::player::PlayerId;
use super::role::{Faction, Role};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Night,
    Day,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteCount {
    pub target_id: PlayerId,
    pub votes: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Investigation {
    pub detective_id: PlayerId,
    pub target_id: PlayerId,
    pub faction: Faction,
}

/// What a resolution decided, before redaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Night {
        killed: Option<PlayerId>,
        saved: Option<PlayerId>,
        investigations: Vec<Investigation>,
    },
    Day {
        eliminated: Option<PlayerId>,
        tally: Vec<VoteCount>,
        tied: bool,
    },
}

impl Outcome {
    pub fn kind(&self) -> ResolutionKind {
        match self {
            Outcome::Night { .. } => ResolutionKind::Night,
            Outcome::Day { .. } => ResolutionKind::Day,
        }
    }

    pub fn deaths(&self) -> Vec<PlayerId> {
        match self {
            Outcome::Night { killed, .. } => killed.iter().cloned().collect(),
            Outcome::Day { .. } => Vec::new(),
        }
    }

    pub fn eliminated(&self) -> Option<PlayerId> {
        match self {
            Outcome::Night { .. } => None,
            Outcome::Day { eliminated, .. } => eliminated.clone(),
        }
    }

    /// Everyone who stopped being alive because of this outcome.
    pub fn casualties(&self) -> Vec<PlayerId> {
        let mut ids = self.deaths();
        ids.extend(self.eliminated());
        ids
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevealedRole {
    pub player_id: PlayerId,
    pub role: Role,
}

/// One resolved phase. Appended once and never modified.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub sequence: u32,
    pub day_number: u32,
    pub phase_id: u64,
    pub actions: Vec<Action>,
    pub outcome: Outcome,
    pub revealed: Vec<RevealedRole>,
    pub resolved_at: DateTime<Utc>,
    // chained over the previous entry's hash
    pub audit_hash: String,
}

/// Public face of a history entry: only what was announced at the time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicHistoryEntry {
    pub sequence: u32,
    pub day_number: u32,
    pub kind: ResolutionKind,
    pub deaths: Vec<PlayerId>,
    pub eliminated: Option<PlayerId>,
    pub redacted_roles: Vec<RevealedRole>,
    pub resolved_at: DateTime<Utc>,
    pub audit_hash: String,
}

impl From<&HistoryEntry> for PublicHistoryEntry {
    fn from(entry: &HistoryEntry) -> Self {
        PublicHistoryEntry {
            sequence: entry.sequence,
            day_number: entry.day_number,
            kind: entry.outcome.kind(),
            deaths: entry.outcome.deaths(),
            eliminated: entry.outcome.eliminated(),
            redacted_roles: entry.revealed.clone(),
            resolved_at: entry.resolved_at,
            audit_hash: entry.audit_hash.clone(),
        }
    }
}
