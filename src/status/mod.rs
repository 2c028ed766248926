// src/status/mod.rs

//! HTTP status endpoint: a JSON snapshot of every configured server's
//! score, player counts, round history and leaderboards.

pub mod router;
pub mod state;
