//! Main entry point for the chat relay.
//!
//! Initializes the actor system (one supervisor owning one session per
//! configured game server) and launches the HTTP server with the status
//! endpoint.

use std::sync::Arc;

use actix::Actor;
use actix_web::{App, HttpServer, web};

pub mod config;

mod api;
mod chat;
mod notify;
mod relay;
mod status;
mod store;
mod tracker;


use api::RestApi;
use chat::TcpTransport;
use config::RelayConfig;
use notify::LogNotifier;
use relay::supervisor::{RelayDeps, RelaySupervisor};
use status::state::AppState;
use store::FileStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "herald.json".to_string());
    let config = Arc::new(RelayConfig::load(&config_path).map_err(std::io::Error::other)?);

    let deps = Arc::new(RelayDeps {
        config: config.clone(),
        transport: Arc::new(TcpTransport),
        api: Arc::new(RestApi::new()),
        store: Arc::new(FileStore::new(config.data_dir.clone())),
        notifier: Arc::new(LogNotifier),
    });

    // The supervisor starts a session for every configured server and
    // keeps them alive for the lifetime of the process.
    let _supervisor = RelaySupervisor::new(deps.clone()).start();

    // Shared application state for the HTTP status handlers.
    let state = web::Data::new(AppState::new(
        config.clone(),
        deps.api.clone(),
        deps.store.clone(),
    ));

    let bind = config.http_bind.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(crate::status::router::config)
    })
    .bind(bind.as_str())?
    .run()
    .await
}
