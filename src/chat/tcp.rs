//! TCP chat-gateway transport.
//!
//! Speaks newline-delimited JSON frames to a chat gateway that owns the
//! actual wire protocol. A driver task reconnects forever with a short
//! backoff until the connection is closed; a line that fails to parse is
//! logged and forwarded as [`InboundEvent::Other`] so it still refreshes
//! liveness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use actix::Recipient;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use super::{ChatConnection, ChatTransport, InboundEvent, OutboundFrame, TransportError};
use crate::config::ServerConfig;
use crate::config::relay::CONNECT_RETRY_SECS;
use crate::relay::messages::TransportEvent;

pub struct TcpTransport;

impl ChatTransport for TcpTransport {
    fn connect(
        &self,
        server: &ServerConfig,
        resource: &str,
        events: Recipient<TransportEvent>,
    ) -> Result<Box<dyn ChatConnection>, TransportError> {
        let (tx, rx) = unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let driver = tokio::spawn(run_driver(
            server.chat_addr.clone(),
            OutboundFrame::Login {
                username: server.username.clone(),
                password: server.password.clone(),
                resource: resource.to_string(),
            },
            events,
            rx,
            closed.clone(),
        ));
        Ok(Box::new(TcpConnection { tx, closed, driver }))
    }
}

struct TcpConnection {
    tx: UnboundedSender<OutboundFrame>,
    closed: Arc<AtomicBool>,
    driver: JoinHandle<()>,
}

impl ChatConnection for TcpConnection {
    fn send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(TransportError::Closed);
        }
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Relaxed);
        self.driver.abort();
    }
}

async fn run_driver(
    addr: String,
    login: OutboundFrame,
    events: Recipient<TransportEvent>,
    mut outbound: UnboundedReceiver<OutboundFrame>,
    closed: Arc<AtomicBool>,
) {
    loop {
        if closed.load(Ordering::Relaxed) {
            return;
        }
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                let (read_half, mut write_half) = stream.into_split();
                if write_frame(&mut write_half, &login).await.is_err() {
                    deliver(&events, &closed, InboundEvent::Disconnect);
                } else {
                    deliver(&events, &closed, InboundEvent::Online);
                    let mut lines = BufReader::new(read_half).lines();
                    loop {
                        if closed.load(Ordering::Relaxed) {
                            return;
                        }
                        tokio::select! {
                            line = lines.next_line() => match line {
                                Ok(Some(line)) => deliver(&events, &closed, parse_line(&line)),
                                Ok(None) | Err(_) => {
                                    deliver(&events, &closed, InboundEvent::Disconnect);
                                    break;
                                }
                            },
                            frame = outbound.recv() => match frame {
                                Some(frame) => {
                                    if write_frame(&mut write_half, &frame).await.is_err() {
                                        deliver(&events, &closed, InboundEvent::Disconnect);
                                        break;
                                    }
                                }
                                // Connection handle dropped; nothing left to do.
                                None => return,
                            },
                        }
                    }
                }
            }
            Err(err) => {
                deliver(
                    &events,
                    &closed,
                    InboundEvent::TransportError {
                        detail: err.to_string(),
                    },
                );
            }
        }
        tokio::time::sleep(Duration::from_secs(CONNECT_RETRY_SECS)).await;
        debug!("[Transport] retrying connection to {addr}");
    }
}

/// Forward an event unless the connection has been closed in the
/// meantime. The abort in `close()` cannot recall an event the select
/// loop is about to send, so every delivery re-checks the flag.
fn deliver(events: &Recipient<TransportEvent>, closed: &AtomicBool, event: InboundEvent) {
    if !closed.load(Ordering::Relaxed) {
        events.do_send(TransportEvent(event));
    }
}

async fn write_frame(
    writer: &mut (impl AsyncWriteExt + Unpin),
    frame: &OutboundFrame,
) -> std::io::Result<()> {
    // Frames are small; a serialization failure would be a programming
    // error, so fall back to an empty object rather than killing the link.
    let mut line = serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}

fn parse_line(line: &str) -> InboundEvent {
    match serde_json::from_str(line) {
        Ok(event) => event,
        Err(err) => {
            warn!("[Transport] unparseable frame ignored: {err}");
            InboundEvent::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_frames_parse() {
        let event = parse_line(
            r#"{"kind":"room_message","room":"_global","sender":"morrigan","body":"hi","staff":true}"#,
        );
        match event {
            InboundEvent::RoomMessage {
                room,
                sender,
                body,
                staff,
            } => {
                assert_eq!(room, "_global");
                assert_eq!(sender, "morrigan");
                assert_eq!(body, "hi");
                assert!(staff);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn optional_fields_default() {
        let event = parse_line(r#"{"kind":"presence","room":"_global","sender":"morrigan"}"#);
        match event {
            InboundEvent::Presence {
                role,
                roster_complete,
                ..
            } => {
                assert_eq!(role, None);
                assert!(!roster_complete);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn garbage_becomes_other() {
        assert!(matches!(parse_line("not json"), InboundEvent::Other));
        assert!(matches!(
            parse_line(r#"{"kind":"weird_new_thing"}"#),
            InboundEvent::Other
        ));
    }

    #[tokio::test]
    async fn closed_connection_rejects_sends() {
        let (tx, _rx) = unbounded_channel();
        let mut conn = TcpConnection {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            driver: tokio::spawn(async {}),
        };
        assert!(
            conn.send(OutboundFrame::Presence {
                show: "chat".to_string()
            })
            .is_ok()
        );
        conn.close();
        assert!(matches!(
            conn.send(OutboundFrame::Presence {
                show: "chat".to_string()
            }),
            Err(TransportError::Closed)
        ));
        // Closing twice is fine.
        conn.close();
    }
}
