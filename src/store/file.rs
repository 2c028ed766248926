//! JSON-file backed [`StatsStore`].
//!
//! One file per server per key under a data directory. When a key is read
//! for the first time the default blob is written out, so the files are
//! always present and editable after first run.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{GameStats, PlayerRoster, StatsStore, StoreError};
use crate::tracker::epoch_now;

/// The MOTD written on first read, matching the format users see.
pub const DEFAULT_MOTD: &str = "MOTD: ";

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, server: &str, key: &str) -> PathBuf {
        self.dir.join(format!("{server}.{key}.json"))
    }

    /// Read a JSON blob, writing and returning the default when the file
    /// does not exist yet.
    fn load_or_init<T>(&self, path: &Path, default: impl FnOnce() -> T) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        match fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let value = default();
                self.write_blob(path, &value)?;
                info!("[Store] {} did not exist, default created", path.display());
                Ok(value)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_blob<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, serde_json::to_string(value)?)?;
        Ok(())
    }
}

impl StatsStore for FileStore {
    fn load_motd(&self, server: &str) -> Result<String, StoreError> {
        self.load_or_init(&self.path(server, "motd"), || DEFAULT_MOTD.to_string())
    }

    fn save_motd(&self, server: &str, text: &str) -> Result<(), StoreError> {
        self.write_blob(&self.path(server, "motd"), &text.to_string())
    }

    fn load_optout(&self, server: &str) -> Result<HashSet<String>, StoreError> {
        self.load_or_init(&self.path(server, "motd-optout"), HashSet::new)
    }

    fn save_optout(&self, server: &str, users: &HashSet<String>) -> Result<(), StoreError> {
        self.write_blob(&self.path(server, "motd-optout"), users)
    }

    fn load_game_stats(&self, server: &str, now: u64) -> Result<GameStats, StoreError> {
        self.load_or_init(&self.path(server, "game-stats"), || GameStats::initial(now))
    }

    fn load_players(&self, server: &str) -> Result<PlayerRoster, StoreError> {
        self.load_or_init(&self.path(server, "player-stats"), PlayerRoster::default)
    }

    fn save_round_stats(
        &self,
        server: &str,
        game: &GameStats,
        players: &PlayerRoster,
    ) -> Result<(), StoreError> {
        self.write_blob(&self.path(server, "game-stats"), game)?;
        self.write_blob(&self.path(server, "player-stats"), players)
    }

    fn append_chat_log(
        &self,
        server: &str,
        room: &str,
        sender: &str,
        body: &str,
    ) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(format!("{server}.chatlog.txt")))?;
        writeln!(file, "{} [{}] {}: {}", epoch_now(), room, sender, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Faction;

    fn scratch_store(tag: &str) -> (FileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "herald-store-{tag}-{}",
            uuid::Uuid::new_v4().simple()
        ));
        (FileStore::new(&dir), dir)
    }

    #[test]
    fn missing_keys_initialize_to_defaults() {
        let (store, dir) = scratch_store("defaults");
        assert_eq!(store.load_motd("wyrmling").unwrap(), "MOTD: ");
        assert!(store.load_optout("wyrmling").unwrap().is_empty());
        let stats = store.load_game_stats("wyrmling", 12345).unwrap();
        assert_eq!(stats.first_round_at, 12345);
        assert_eq!(stats.rounds_played, 0);
        assert!(store.load_players("wyrmling").unwrap().is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn round_stats_round_trip() {
        let (store, dir) = scratch_store("roundtrip");
        let mut stats = store.load_game_stats("wyrmling", 100).unwrap();
        stats.rounds_played = 3;
        stats.wins.add(Faction::Viking);
        let mut roster = PlayerRoster::default();
        roster
            .upsert(&crate::api::PlayerRef {
                name: "beowulf".into(),
                faction: Some(Faction::Viking),
                race: None,
                archetype: None,
            })
            .kills = 7;
        store.save_round_stats("wyrmling", &stats, &roster).unwrap();

        // A second read sees the persisted values, not the initial defaults.
        let reread = store.load_game_stats("wyrmling", 999).unwrap();
        assert_eq!(reread, stats);
        let players = store.load_players("wyrmling").unwrap();
        assert_eq!(players.get("beowulf").unwrap().kills, 7);
        let _ = fs::remove_dir_all(dir);
    }
}
