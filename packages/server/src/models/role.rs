use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    MafiaLeader,
    Mafioso,
    Healer,
    Detective,
    Citizen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Mafia,
    Town,
}

impl Role {
    pub fn faction(self) -> Faction {
        match self {
            Role::MafiaLeader | Role::Mafioso => Faction::Mafia,
            Role::Healer | Role::Detective | Role::Citizen => Faction::Town,
        }
    }

    pub fn can_perform(self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Kill => matches!(self, Role::MafiaLeader | Role::Mafioso),
            ActionKind::Heal => self == Role::Healer,
            ActionKind::Investigate => self == Role::Detective,
            ActionKind::Vote => true,
        }
    }

    /// Roles whose night action must be in before the night can end early.
    pub fn gates_night(self) -> bool {
        matches!(self, Role::MafiaLeader | Role::Healer)
    }

    /// The action this role submits during the night, if any.
    pub fn night_action(self) -> Option<ActionKind> {
        match self {
            Role::MafiaLeader | Role::Mafioso => Some(ActionKind::Kill),
            Role::Healer => Some(ActionKind::Heal),
            Role::Detective => Some(ActionKind::Investigate),
            Role::Citizen => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::MafiaLeader => write!(f, "mafia_leader"),
            Role::Mafioso => write!(f, "mafioso"),
            Role::Healer => write!(f, "healer"),
            Role::Detective => write!(f, "detective"),
            Role::Citizen => write!(f, "citizen"),
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Mafia => write!(f, "mafia"),
            Faction::Town => write!(f, "town"),
        }
    }
}
