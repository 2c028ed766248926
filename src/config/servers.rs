//! File-loaded relay configuration.
//!
//! Loaded once at startup and immutable afterwards; changing a server's
//! descriptor requires restarting that server's session.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::relay;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration: global settings plus one descriptor per game
/// server the relay should attach to.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Users allowed to run admin commands regardless of staff flags.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Messages matching any of these keywords escalate to the minimal
    /// notification tier as test alerts.
    #[serde(default)]
    pub test_keywords: Vec<String>,
    /// Directory for the JSON state files and chat logs.
    pub data_dir: PathBuf,
    /// Bind address of the HTTP status endpoint.
    #[serde(default = "default_http_bind")]
    pub http_bind: String,
    pub servers: Vec<ServerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    /// Address of the chat gateway for this server.
    pub chat_addr: String,
    /// Base URL of this server's game-status API.
    pub api_base: String,
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub rooms: Vec<RoomConfig>,
    #[serde(default = "default_round_duration")]
    pub round_duration_secs: u64,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    pub name: String,
    /// Deliver the MOTD to users joining this room.
    #[serde(default)]
    pub motd: bool,
    /// Fan out staff messages from this room via the notifier.
    #[serde(default)]
    pub monitor: bool,
    /// Append this room's traffic to the chat log.
    #[serde(default)]
    pub log: bool,
}

/// Per-server overrides of the timing constants in [`super::relay`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub stanza_timeout_secs: u64,
    pub motd_grace_secs: u64,
    pub motd_cooldown_secs: u64,
    pub round_poll_interval_secs: u64,
    pub down_poll_budget: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stanza_timeout_secs: relay::STANZA_TIMEOUT_SECS,
            motd_grace_secs: relay::MOTD_GRACE_SECS,
            motd_cooldown_secs: relay::MOTD_COOLDOWN_SECS,
            round_poll_interval_secs: relay::ROUND_POLL_INTERVAL_SECS,
            down_poll_budget: relay::DOWN_POLL_BUDGET,
        }
    }
}

fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_round_duration() -> u64 {
    relay::DEFAULT_ROUND_DURATION_SECS
}

impl RelayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn is_admin(&self, user: &str) -> bool {
        self.admins.iter().any(|a| a == user)
    }

    /// Case-insensitive keyword match used to escalate test alerts.
    pub fn is_test_message(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.test_keywords
            .iter()
            .any(|kw| message.contains(&kw.to_lowercase()))
    }
}
