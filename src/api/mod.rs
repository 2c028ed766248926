// src/api/mod.rs

//! Game-status REST API collaborator.
//!
//! The relay treats the API as a black box behind the [`GameApi`] trait:
//! async queries returning structured data or an error. Callers retry a
//! bounded number of times and fold sustained failure into a "down" poll
//! tick; the round tracker never stops polling on failure.

pub mod rest;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::store::Faction;

pub use rest::RestApi;

/// Control-game phase as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GamePhase {
    Disabled,
    Waiting,
    BasicActive,
    AdvancedActive,
}

impl GamePhase {
    pub fn is_active(self) -> bool {
        matches!(self, GamePhase::BasicActive | GamePhase::AdvancedActive)
    }

    pub fn describe(self) -> &'static str {
        match self {
            GamePhase::Disabled => "Disabled",
            GamePhase::Waiting => "Waiting For Next Round",
            GamePhase::BasicActive => "Basic Game Active",
            GamePhase::AdvancedActive => "Advanced Game Active",
        }
    }
}

impl TryFrom<u8> for GamePhase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(GamePhase::Disabled),
            1 => Ok(GamePhase::Waiting),
            2 => Ok(GamePhase::BasicActive),
            3 => Ok(GamePhase::AdvancedActive),
            other => Err(format!("unknown game state {other}")),
        }
    }
}

impl From<GamePhase> for u8 {
    fn from(phase: GamePhase) -> u8 {
        phase as u8
    }
}

/// One control-game poll: remaining round time, per-faction scores and the
/// current phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlGame {
    pub time_left: u64,
    pub arthurian_score: i64,
    pub tuatha_de_danann_score: i64,
    pub viking_score: i64,
    pub game_state: GamePhase,
}

/// Players currently online, per faction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCounts {
    pub arthurians: u64,
    pub tuatha_de_danann: u64,
    pub vikings: u64,
}

impl PlayerCounts {
    pub fn total(&self) -> u64 {
        self.arthurians + self.tuatha_de_danann + self.vikings
    }
}

/// A player as referenced by the kill feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub name: String,
    #[serde(default)]
    pub faction: Option<Faction>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub archetype: Option<String>,
}

/// One kill-feed entry. Either side may be missing (environment deaths,
/// truncated records); callers tolerate both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillEvent {
    #[serde(default)]
    pub killer: Option<PlayerRef>,
    #[serde(default)]
    pub victim: Option<PlayerRef>,
}

/// A scheduled in-game event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub name: String,
    #[serde(default)]
    pub start_time: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned status {0}")]
    Status(u16),
}

pub type ApiFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// Async game-status queries. Implementations must bound each request with
/// a short timeout so a slow API can never stall a session tick.
pub trait GameApi: Send + Sync {
    fn get_players(&self, server: &ServerConfig) -> ApiFuture<PlayerCounts>;
    fn get_control_game(&self, server: &ServerConfig) -> ApiFuture<ControlGame>;
    /// Kill-feed entries recorded at or after `since` (epoch seconds).
    fn get_kills(&self, server: &ServerConfig, since: u64) -> ApiFuture<Vec<KillEvent>>;
    fn get_events(&self, server: &ServerConfig) -> ApiFuture<Vec<ScheduledEvent>>;
}
