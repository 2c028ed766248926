//! Per-room join state.
//!
//! A room counts as joined only once the protocol's "initial roster
//! complete" signal arrives. Until then MOTD delivery and message relay
//! for that room are suppressed, so the flood of presence stanzas replayed
//! on (re)join never queues MOTDs for users who were already present.

use std::collections::HashMap;

use crate::config::RoomConfig;

/// State of a single configured chat room.
pub struct RoomState {
    pub name: String,
    pub joined: bool,
    pub monitored: bool,
    pub motd_enabled: bool,
    pub logging_enabled: bool,
}

/// All configured rooms for one session, keyed by room name.
pub struct RoomSet {
    rooms: HashMap<String, RoomState>,
}

impl RoomSet {
    pub fn from_config(rooms: &[RoomConfig]) -> Self {
        let rooms = rooms
            .iter()
            .map(|r| {
                (
                    r.name.clone(),
                    RoomState {
                        name: r.name.clone(),
                        joined: false,
                        monitored: r.monitor,
                        motd_enabled: r.motd,
                        logging_enabled: r.log,
                    },
                )
            })
            .collect();
        Self { rooms }
    }

    pub fn get(&self, name: &str) -> Option<&RoomState> {
        self.rooms.get(name)
    }

    /// Mark a room's initial roster as complete. Returns false for an
    /// unknown room, which callers treat as a defensive no-op.
    pub fn mark_joined(&mut self, name: &str) -> bool {
        match self.rooms.get_mut(name) {
            Some(room) => {
                room.joined = true;
                true
            }
            None => false,
        }
    }

    /// Reset all join flags. Called on every disconnect.
    pub fn reset_joined(&mut self) {
        for room in self.rooms.values_mut() {
            room.joined = false;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomState> {
        self.rooms.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> RoomSet {
        RoomSet::from_config(&[
            RoomConfig {
                name: "_global".into(),
                motd: true,
                monitor: true,
                log: false,
            },
            RoomConfig {
                name: "_it".into(),
                motd: false,
                monitor: false,
                log: true,
            },
        ])
    }

    #[test]
    fn joined_starts_false_and_resets_on_disconnect() {
        let mut rooms = set();
        assert!(!rooms.get("_global").unwrap().joined);
        assert!(rooms.mark_joined("_global"));
        assert!(rooms.get("_global").unwrap().joined);
        rooms.reset_joined();
        assert!(!rooms.get("_global").unwrap().joined);
    }

    #[test]
    fn unknown_room_is_a_noop() {
        let mut rooms = set();
        assert!(!rooms.mark_joined("_nope"));
        assert!(rooms.get("_nope").is_none());
    }
}
