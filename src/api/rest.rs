//! HTTP implementation of [`GameApi`] over `reqwest`.
//!
//! Every request carries the client-wide timeout from
//! `config::relay::API_TIMEOUT_SECS`; the per-server base URL comes from
//! configuration.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{ApiError, ApiFuture, ControlGame, GameApi, KillEvent, PlayerCounts, ScheduledEvent};
use crate::config::ServerConfig;
use crate::config::relay::API_TIMEOUT_SECS;

pub struct RestApi {
    client: Client,
}

impl RestApi {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            // Builder only fails on TLS backend misconfiguration, which is
            // unrecoverable at startup anyway.
            .unwrap_or_default();
        Self { client }
    }

    fn fetch<T>(&self, url: String, query: Vec<(&'static str, String)>) -> ApiFuture<T>
    where
        T: DeserializeOwned + 'static,
    {
        let client = self.client.clone();
        Box::pin(async move {
            let response = client.get(&url).query(&query).send().await?;
            if !response.status().is_success() {
                return Err(ApiError::Status(response.status().as_u16()));
            }
            Ok(response.json::<T>().await?)
        })
    }
}

impl Default for RestApi {
    fn default() -> Self {
        Self::new()
    }
}

impl GameApi for RestApi {
    fn get_players(&self, server: &ServerConfig) -> ApiFuture<PlayerCounts> {
        self.fetch(format!("{}/game/players", server.api_base), Vec::new())
    }

    fn get_control_game(&self, server: &ServerConfig) -> ApiFuture<ControlGame> {
        self.fetch(format!("{}/game/controlgame", server.api_base), Vec::new())
    }

    fn get_kills(&self, server: &ServerConfig, since: u64) -> ApiFuture<Vec<KillEvent>> {
        self.fetch(
            format!("{}/kills", server.api_base),
            vec![("start", since.to_string())],
        )
    }

    fn get_events(&self, server: &ServerConfig) -> ApiFuture<Vec<ScheduledEvent>> {
        self.fetch(format!("{}/scheduledevents", server.api_base), Vec::new())
    }
}
