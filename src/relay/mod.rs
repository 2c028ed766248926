// src/relay/mod.rs

//! The relay actor layer: one supervisor, one session per game server,
//! and the chat command surface.

pub mod commands;
pub mod messages;
pub mod session;
pub mod supervisor;
