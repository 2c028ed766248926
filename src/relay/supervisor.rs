/// Relay supervisor actor.
///
/// Owns the map of running server sessions and is the only place sessions
/// are created or torn down, which keeps the invariant of exactly one live
/// session per server. Handles admin start/stop, liveness-driven restarts,
/// and routes cross-server MOTD mutations to the owning session.
use actix::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use super::messages::{
    ApplyMotd, ApplyOptOut, RestartRequest, SetMotd, SetMotdOptOut, StartSession, Stop,
    StopSession,
};
use super::session::ServerSession;
use crate::api::GameApi;
use crate::chat::ChatTransport;
use crate::config::{RelayConfig, ServerConfig};
use crate::notify::Notifier;
use crate::store::StatsStore;

/// Immutable collaborators shared by the supervisor and every session.
pub struct RelayDeps {
    pub config: Arc<RelayConfig>,
    pub transport: Arc<dyn ChatTransport>,
    pub api: Arc<dyn GameApi>,
    pub store: Arc<dyn StatsStore>,
    pub notifier: Arc<dyn Notifier>,
}

struct RunningSession {
    addr: Addr<ServerSession>,
    incarnation: Uuid,
}

pub struct RelaySupervisor {
    deps: Arc<RelayDeps>,
    sessions: HashMap<String, RunningSession>,
}

impl RelaySupervisor {
    pub fn new(deps: Arc<RelayDeps>) -> Self {
        Self {
            deps,
            sessions: HashMap::new(),
        }
    }

    fn spawn_session(&mut self, server: &ServerConfig, ctx: &mut Context<Self>) {
        let incarnation = Uuid::new_v4();
        let session = ServerSession::new(
            Arc::new(server.clone()),
            self.deps.clone(),
            ctx.address(),
            incarnation,
        );
        let addr = session.start();
        info!(
            "[Supervisor] session {} started for {}",
            incarnation.simple(),
            server.name
        );
        self.sessions
            .insert(server.name.clone(), RunningSession { addr, incarnation });
    }
}

impl Actor for RelaySupervisor {
    type Context = Context<Self>;

    /// Start a session for every configured server.
    fn started(&mut self, ctx: &mut Self::Context) {
        let servers: Vec<ServerConfig> = self.deps.config.servers.clone();
        for server in &servers {
            self.spawn_session(server, ctx);
        }
    }
}

impl Handler<StartSession> for RelaySupervisor {
    type Result = Result<String, String>;

    fn handle(&mut self, msg: StartSession, ctx: &mut Self::Context) -> Self::Result {
        if self.sessions.contains_key(&msg.name) {
            return Err(format!("A client for {} is already running.", msg.name));
        }
        let Some(server) = self.deps.config.server(&msg.name).cloned() else {
            return Err(format!("A server named '{}' does not exist.", msg.name));
        };
        self.spawn_session(&server, ctx);
        Ok(format!("A client for {} has been started.", msg.name))
    }
}

impl Handler<StopSession> for RelaySupervisor {
    type Result = Result<String, String>;

    fn handle(&mut self, msg: StopSession, _: &mut Self::Context) -> Self::Result {
        match self.sessions.remove(&msg.name) {
            Some(running) => {
                running.addr.do_send(Stop);
                info!("[Supervisor] session for {} stopped", msg.name);
                Ok(format!("Client for {} has been stopped.", msg.name))
            }
            None => Err(format!("No client is running for server '{}'.", msg.name)),
        }
    }
}

impl Handler<RestartRequest> for RelaySupervisor {
    type Result = ();

    fn handle(&mut self, msg: RestartRequest, ctx: &mut Self::Context) -> Self::Result {
        // A request from an incarnation we already replaced is a late
        // callback of a dead session; drop it.
        match self.sessions.get(&msg.name) {
            Some(running) if running.incarnation == msg.incarnation => {}
            _ => {
                warn!(
                    "[Supervisor] stale restart request for {} ignored",
                    msg.name
                );
                return;
            }
        }
        warn!("[Supervisor] restarting session for {}", msg.name);
        if let Some(running) = self.sessions.remove(&msg.name) {
            running.addr.do_send(Stop);
        }
        if let Some(server) = self.deps.config.server(&msg.name).cloned() {
            self.spawn_session(&server, ctx);
        }
    }
}

impl Handler<SetMotd> for RelaySupervisor {
    type Result = ResponseFuture<Result<String, String>>;

    fn handle(&mut self, msg: SetMotd, _: &mut Self::Context) -> Self::Result {
        if let Some(running) = self.sessions.get(&msg.server) {
            let addr = running.addr.clone();
            Box::pin(async move {
                addr.send(ApplyMotd {
                    sender: msg.sender,
                    text: msg.text,
                })
                .await
                .unwrap_or_else(|err| Err(format!("Session unavailable: {err}")))
            })
        } else {
            // No session running; write straight through the store so the
            // MOTD is picked up when the session next starts.
            let result = match self
                .deps
                .store
                .save_motd(&msg.server, &format!("MOTD: {}", msg.text))
            {
                Ok(()) => Ok(format!("MOTD for {} set to: {}", msg.server, msg.text)),
                Err(err) => {
                    warn!("[Supervisor] MOTD write for {} failed: {err}", msg.server);
                    Err("Unable to write MOTD file.".to_string())
                }
            };
            Box::pin(async move { result })
        }
    }
}

impl Handler<SetMotdOptOut> for RelaySupervisor {
    type Result = ResponseFuture<Result<String, String>>;

    fn handle(&mut self, msg: SetMotdOptOut, _: &mut Self::Context) -> Self::Result {
        if let Some(running) = self.sessions.get(&msg.server) {
            let addr = running.addr.clone();
            Box::pin(async move {
                addr.send(ApplyOptOut {
                    user: msg.user,
                    opt_out: msg.opt_out,
                })
                .await
                .unwrap_or_else(|err| Err(format!("Session unavailable: {err}")))
            })
        } else {
            let result = apply_optout_via_store(&*self.deps.store, &msg);
            Box::pin(async move { result })
        }
    }
}

fn apply_optout_via_store(
    store: &dyn StatsStore,
    msg: &SetMotdOptOut,
) -> Result<String, String> {
    let mut optout = store
        .load_optout(&msg.server)
        .map_err(|err| format!("Unable to read MOTD opt-out list: {err}"))?;
    let changed = if msg.opt_out {
        optout.insert(msg.user.clone())
    } else {
        optout.remove(&msg.user)
    };
    if !changed {
        return Ok(if msg.opt_out {
            format!(
                "User '{}' already unsubscribed from {} MOTD notices.",
                msg.user, msg.server
            )
        } else {
            format!(
                "User '{}' already subscribed to {} MOTD notices.",
                msg.user, msg.server
            )
        });
    }
    match store.save_optout(&msg.server, &optout) {
        Ok(()) => Ok(if msg.opt_out {
            format!(
                "User '{}' unsubscribed from {} MOTD notices.",
                msg.user, msg.server
            )
        } else {
            format!(
                "User '{}' subscribed to {} MOTD notices.",
                msg.user, msg.server
            )
        }),
        Err(err) => {
            warn!("[Supervisor] opt-out write for {} failed: {err}", msg.server);
            Err("Unable to write MOTD opt-out list.".to_string())
        }
    }
}
