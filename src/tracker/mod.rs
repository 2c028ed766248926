// src/tracker/mod.rs

//! Pure per-session tracking logic, kept free of actors and I/O so it can
//! be unit tested directly:
//! - Connection liveness (time since last inbound event)
//! - Room join state (gates MOTD delivery and relay)
//! - Delayed MOTD delivery queue
//! - Round state machine (polls -> round transitions and win credit)

pub mod liveness;
pub mod motd;
pub mod rooms;
pub mod rounds;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as whole seconds since the Unix epoch.
pub fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
