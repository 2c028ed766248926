// src/chat/mod.rs

//! Chat transport collaborator.
//!
//! The wire protocol (stanza parsing, XML, keepalives) lives on the far
//! side of this seam: a transport delivers already-structured
//! [`InboundEvent`]s to the owning session actor and accepts
//! [`OutboundFrame`]s. The shipped implementation speaks newline-delimited
//! JSON to a chat gateway over TCP, see [`tcp`].

pub mod tcp;

use actix::Recipient;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::relay::messages::TransportEvent;

pub use tcp::TcpTransport;

/// Structured inbound events from the chat transport. Every variant,
/// including ones the session ignores, refreshes the liveness clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Connection established and authenticated.
    Online,
    /// Connection lost; the transport keeps retrying on its own.
    Disconnect,
    /// Transport-level failure (DNS, timeout). Logged, never fatal:
    /// recovery is driven by the liveness monitor.
    TransportError { detail: String },
    /// A user's presence changed in a room. `roster_complete` carries the
    /// protocol's "initial roster sent" signal that marks the room joined.
    Presence {
        room: String,
        sender: String,
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        roster_complete: bool,
    },
    /// A group-chat message. `staff` is the transport's staff-member flag.
    RoomMessage {
        room: String,
        sender: String,
        body: String,
        #[serde(default)]
        staff: bool,
    },
    /// A private message; `from` is the full sender address.
    DirectMessage {
        from: String,
        body: String,
        #[serde(default)]
        staff: bool,
    },
    /// An error stanza. Logged and otherwise ignored.
    ErrorStanza { detail: String },
    /// Anything else; still counts as transport activity.
    Other,
}

/// Outbound frames accepted by a chat connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundFrame {
    Login {
        username: String,
        password: String,
        resource: String,
    },
    /// Mark ourselves available for chat.
    Presence { show: String },
    JoinRoom { room: String, nickname: String },
    RoomMessage { room: String, body: String },
    DirectMessage { to: String, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport connection failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error("transport connection is closed")]
    Closed,
}

/// Handle to one live chat connection.
pub trait ChatConnection: Send {
    /// Queue a frame for sending. Frames queued while the underlying link
    /// is down are delivered after the transport's automatic reconnect.
    fn send(&self, frame: OutboundFrame) -> Result<(), TransportError>;

    /// Tear the connection down and stop event delivery. Idempotent. An
    /// event already queued in the recipient's mailbox may still arrive
    /// after this returns; sessions gate late deliveries on their own
    /// stopped state.
    fn close(&mut self);
}

/// Factory for chat connections.
pub trait ChatTransport: Send + Sync {
    /// Open a connection for `server`, identifying with the given
    /// connection-resource suffix, delivering events to `events`.
    fn connect(
        &self,
        server: &ServerConfig,
        resource: &str,
        events: Recipient<TransportEvent>,
    ) -> Result<Box<dyn ChatConnection>, TransportError>;
}
