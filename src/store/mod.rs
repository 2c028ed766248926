// src/store/mod.rs

//! Durable per-server statistics and chat-bot state.
//!
//! Persistence itself is behind the [`StatsStore`] trait: the relay only
//! needs keyed load/save of small JSON blobs per server. Missing keys
//! initialize to documented defaults on first read. Writes are
//! fire-and-forget with error logging; a lost write is superseded by the
//! next successful one.

pub mod file;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub use file::FileStore;

/// One of the three competing faction alignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Arthurian,
    TuathaDeDanann,
    Viking,
}

impl Faction {
    pub const ALL: [Faction; 3] = [Faction::Arthurian, Faction::TuathaDeDanann, Faction::Viking];

    pub fn as_str(self) -> &'static str {
        match self {
            Faction::Arthurian => "Arthurian",
            Faction::TuathaDeDanann => "TuathaDeDanann",
            Faction::Viking => "Viking",
        }
    }
}

/// Win counters, one per faction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionTally {
    pub arthurian: u64,
    pub tuatha_de_danann: u64,
    pub viking: u64,
}

impl FactionTally {
    pub fn add(&mut self, faction: Faction) {
        match faction {
            Faction::Arthurian => self.arthurian += 1,
            Faction::TuathaDeDanann => self.tuatha_de_danann += 1,
            Faction::Viking => self.viking += 1,
        }
    }

    pub fn get(&self, faction: Faction) -> u64 {
        match faction {
            Faction::Arthurian => self.arthurian,
            Faction::TuathaDeDanann => self.tuatha_de_danann,
            Faction::Viking => self.viking,
        }
    }
}

/// Durable per-server round statistics. Mutated only by the round tracker,
/// exactly once per detected round end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub first_round_at: u64,
    pub rounds_played: u64,
    pub last_start_time: u64,
    pub wins: FactionTally,
}

impl GameStats {
    /// The blob written on first read when no stats exist yet.
    pub fn initial(now: u64) -> Self {
        Self {
            first_round_at: now,
            rounds_played: 0,
            last_start_time: 0,
            wins: FactionTally::default(),
        }
    }
}

/// Cumulative per-player statistics for one server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub faction: Option<Faction>,
    pub race: Option<String>,
    pub archetype: Option<String>,
    pub kills: u64,
    pub deaths: u64,
    pub rounds_played: u64,
}

/// All known players for one server, keyed by player name. Leaderboard
/// ordering is computed at render time; storage order is not significant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRoster {
    players: HashMap<String, PlayerRecord>,
}

impl PlayerRoster {
    /// Fetch-or-create the record for a player, refreshing the descriptive
    /// fields from the latest sighting.
    pub fn upsert(&mut self, player: &crate::api::PlayerRef) -> &mut PlayerRecord {
        let record = self
            .players
            .entry(player.name.clone())
            .or_insert_with(|| PlayerRecord {
                name: player.name.clone(),
                ..PlayerRecord::default()
            });
        if player.faction.is_some() {
            record.faction = player.faction;
        }
        if player.race.is_some() {
            record.race = player.race.clone();
        }
        if player.archetype.is_some() {
            record.archetype = player.archetype.clone();
        }
        record
    }

    /// Credit one round played to every listed participant. A player who
    /// only appeared as a victim still counts.
    pub fn credit_round<'a>(&mut self, participants: impl IntoIterator<Item = &'a String>) {
        for name in participants {
            if let Some(record) = self.players.get_mut(name) {
                record.rounds_played += 1;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.players.get(name)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn top_by_kills(&self, count: usize) -> Vec<&PlayerRecord> {
        let mut players: Vec<&PlayerRecord> = self.players.values().collect();
        players.sort_by(|a, b| b.kills.cmp(&a.kills).then_with(|| a.name.cmp(&b.name)));
        players.truncate(count);
        players
    }

    pub fn top_by_deaths(&self, count: usize) -> Vec<&PlayerRecord> {
        let mut players: Vec<&PlayerRecord> = self.players.values().collect();
        players.sort_by(|a, b| b.deaths.cmp(&a.deaths).then_with(|| a.name.cmp(&b.name)));
        players.truncate(count);
        players
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Keyed (by server name) durable storage for the relay's state.
pub trait StatsStore: Send + Sync {
    fn load_motd(&self, server: &str) -> Result<String, StoreError>;
    fn save_motd(&self, server: &str, text: &str) -> Result<(), StoreError>;

    fn load_optout(&self, server: &str) -> Result<HashSet<String>, StoreError>;
    fn save_optout(&self, server: &str, users: &HashSet<String>) -> Result<(), StoreError>;

    fn load_game_stats(&self, server: &str, now: u64) -> Result<GameStats, StoreError>;
    fn load_players(&self, server: &str) -> Result<PlayerRoster, StoreError>;

    /// Persist the round-end write: game stats and player stats together.
    fn save_round_stats(
        &self,
        server: &str,
        game: &GameStats,
        players: &PlayerRoster,
    ) -> Result<(), StoreError>;

    fn append_chat_log(
        &self,
        server: &str,
        room: &str,
        sender: &str,
        body: &str,
    ) -> Result<(), StoreError>;
}
