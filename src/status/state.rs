// src/status/state.rs

//! Application state for the status endpoint.
//!
//! Holds the configuration plus the API and store collaborators the
//! handlers read from. Everything here is read-only; the actor layer owns
//! all mutation.

use std::sync::Arc;

use crate::api::GameApi;
use crate::config::RelayConfig;
use crate::store::StatsStore;

/// Shared application state, injected into HTTP handlers.
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub api: Arc<dyn GameApi>,
    pub store: Arc<dyn StatsStore>,
}

impl AppState {
    pub fn new(
        config: Arc<RelayConfig>,
        api: Arc<dyn GameApi>,
        store: Arc<dyn StatsStore>,
    ) -> Self {
        AppState { config, api, store }
    }
}
