use std::env;
use std::time::Duration;

use super::game::GameRules;
use super::role::Role;
use crate::error::{GameError, GameResult};

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub min_players: usize,
    pub max_players: usize,
    // roles beyond the mandatory mafia leader and healer
    pub mafiosi: usize,
    pub detectives: usize,
    pub night_duration: Duration,
    pub discussion_duration: Duration,
    pub vote_duration: Duration,
    pub reconnect_grace: Duration,
    pub allow_spectators: bool,
    pub allow_self_heal: bool,
    pub allow_self_vote: bool,
    // fixed seed for role shuffles and AI choices; random when unset
    pub role_seed: Option<u64>,
    pub ai_autoplay: bool,
    pub room_idle_ttl: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 5,
            max_players: 12,
            mafiosi: 0,
            detectives: 0,
            night_duration: Duration::from_secs(45),
            discussion_duration: Duration::from_secs(90),
            vote_duration: Duration::from_secs(45),
            reconnect_grace: Duration::from_secs(60),
            allow_spectators: false,
            allow_self_heal: true,
            allow_self_vote: false,
            role_seed: None,
            ai_autoplay: true,
            room_idle_ttl: Duration::from_secs(300),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name).map(|v| v == "true").unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

fn env_seconds(name: &str, default: Duration) -> Duration {
    env_parse::<u64>(name)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_players: env_parse("MAFIA_MIN_PLAYERS").unwrap_or(defaults.min_players),
            max_players: env_parse("MAFIA_MAX_PLAYERS").unwrap_or(defaults.max_players),
            mafiosi: env_parse("MAFIA_MAFIOSI").unwrap_or(defaults.mafiosi),
            detectives: env_parse("MAFIA_DETECTIVES").unwrap_or(defaults.detectives),
            night_duration: env_seconds("MAFIA_NIGHT_SECONDS", defaults.night_duration),
            discussion_duration: env_seconds(
                "MAFIA_DISCUSSION_SECONDS",
                defaults.discussion_duration,
            ),
            vote_duration: env_seconds("MAFIA_VOTE_SECONDS", defaults.vote_duration),
            reconnect_grace: env_seconds(
                "MAFIA_RECONNECT_GRACE_SECONDS",
                defaults.reconnect_grace,
            ),
            allow_spectators: env_flag("MAFIA_ALLOW_SPECTATORS", defaults.allow_spectators),
            allow_self_heal: env_flag("MAFIA_ALLOW_SELF_HEAL", defaults.allow_self_heal),
            allow_self_vote: env_flag("MAFIA_ALLOW_SELF_VOTE", defaults.allow_self_vote),
            role_seed: env_parse("MAFIA_ROLE_SEED"),
            ai_autoplay: env_flag("MAFIA_AI_AUTOPLAY", defaults.ai_autoplay),
            room_idle_ttl: env_seconds("MAFIA_ROOM_IDLE_SECONDS", defaults.room_idle_ttl),
        }
    }

    /// Rules frozen into a game when it starts.
    pub fn rules(&self) -> GameRules {
        GameRules {
            night_duration: self.night_duration,
            discussion_duration: self.discussion_duration,
            vote_duration: self.vote_duration,
            allow_self_heal: self.allow_self_heal,
            allow_self_vote: self.allow_self_vote,
        }
    }

    /// The multiset of roles dealt to `player_count` players: one mafia leader,
    /// one healer, the configured extras, citizens for every remaining seat.
    pub fn role_set(&self, player_count: usize) -> GameResult<Vec<Role>> {
        if player_count < self.min_players {
            return Err(GameError::NotEnoughPlayers {
                required: self.min_players,
                actual: player_count,
            });
        }

        let mut roles = vec![Role::MafiaLeader, Role::Healer];
        roles.extend(std::iter::repeat(Role::Mafioso).take(self.mafiosi));
        roles.extend(std::iter::repeat(Role::Detective).take(self.detectives));

        if roles.len() > player_count {
            return Err(GameError::InvalidRoleSet(format!(
                "{} special roles for {} players",
                roles.len(),
                player_count
            )));
        }

        let mafia = 1 + self.mafiosi;
        let town = player_count - mafia;
        if mafia >= town {
            return Err(GameError::InvalidRoleSet(format!(
                "{} mafia against {} town would end the game immediately",
                mafia, town
            )));
        }

        roles.extend(std::iter::repeat(Role::Citizen).take(player_count - roles.len()));
        Ok(roles)
    }
}
