//! Actor messages exchanged between the relay supervisor and its server
//! sessions.

use actix::prelude::*;
use uuid::Uuid;

use crate::chat::InboundEvent;

/// One structured event from the chat transport, delivered to the owning
/// session actor.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TransportEvent(pub InboundEvent);

/// Idempotent session teardown: cancel timers, close the connection, stop
/// the actor. Safe to send to an already-stopped session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Stop;

/// Start a session for the named server. `Ok`/`Err` both carry the reply
/// text shown to the requesting chat user.
#[derive(Message)]
#[rtype(result = "Result<String, String>")]
pub struct StartSession {
    pub name: String,
}

/// Stop the named server's session.
#[derive(Message)]
#[rtype(result = "Result<String, String>")]
pub struct StopSession {
    pub name: String,
}

/// A session asking to be restarted (liveness timeout). The incarnation id
/// lets the supervisor drop requests from sessions it has already
/// replaced.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RestartRequest {
    pub name: String,
    pub incarnation: Uuid,
}

/// Set a server's MOTD, routed through the supervisor so the owning
/// session (if running) updates its in-memory copy.
#[derive(Message)]
#[rtype(result = "Result<String, String>")]
pub struct SetMotd {
    pub server: String,
    pub sender: String,
    pub text: String,
}

/// Add or remove a user on a server's MOTD opt-out list, routed through
/// the supervisor like [`SetMotd`].
#[derive(Message)]
#[rtype(result = "Result<String, String>")]
pub struct SetMotdOptOut {
    pub server: String,
    pub user: String,
    pub opt_out: bool,
}

/// Session-local application of [`SetMotd`].
#[derive(Message)]
#[rtype(result = "Result<String, String>")]
pub struct ApplyMotd {
    pub sender: String,
    pub text: String,
}

/// Session-local application of [`SetMotdOptOut`].
#[derive(Message)]
#[rtype(result = "Result<String, String>")]
pub struct ApplyOptOut {
    pub user: String,
    pub opt_out: bool,
}
