use std::sync::Arc;

use bytes::Bytes;
use sfu_protocol::control::{parse_inbound, reasons, Event, Inbound, Outbound};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::Notify;

use crate::broadcaster::ControlBroadcaster;
use crate::participant::SessionId;
use crate::registry::{JoinError, Registry};

/// Maximum bytes read per socket receive; this server frames nothing
/// beyond this and treats each receive as one message.
const MAX_MESSAGE_BYTES: usize = 1024;

/// State machine for one reliable connection.
///
/// `AWAIT_JOIN` and `ACTIVE` are represented as the two phases of `run`;
/// `CLOSED` is `run` returning, which always triggers `Registry::leave` on
/// any path that reached past `AWAIT_JOIN`.
pub struct ControlSession;

impl ControlSession {
    /// Drive one accepted connection to completion. Never panics or
    /// propagates transport errors: every error path is contained to this
    /// session.
    pub async fn run(
        stream: TcpStream,
        session_id: SessionId,
        registry: Arc<Registry>,
        default_room: Arc<str>,
        shutdown: Arc<Notify>,
    ) {
        let (mut read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let writer = tokio::spawn(writer_task(write_half, rx));

        if let Some(room) =
            Self::await_join(&mut read_half, &registry, session_id, &default_room, &tx, &shutdown).await
        {
            Self::active_loop(&mut read_half, &registry, session_id, &room, &tx, &shutdown).await;
        }

        if let Some(participant) = registry.leave(session_id) {
            tracing::info!(
                session_id,
                name = %participant.name,
                room = %participant.room,
                "control session closed"
            );
        }

        drop(tx);
        let _ = writer.await;
    }

    /// Returns the joined room name on success, `None` if the session ended
    /// (name conflict, malformed first message, EOF, or shutdown) before
    /// ever reaching `ACTIVE`.
    async fn await_join(
        read_half: &mut tokio::net::tcp::OwnedReadHalf,
        registry: &Registry,
        session_id: SessionId,
        default_room: &str,
        tx: &mpsc::UnboundedSender<Bytes>,
        shutdown: &Notify,
    ) -> Option<String> {
        let mut buf = [0u8; MAX_MESSAGE_BYTES];
        let n = tokio::select! {
            result = read_half.read(&mut buf) => match result {
                Ok(0) | Err(_) => return None,
                Ok(n) => n,
            },
            _ = shutdown.notified() => return None,
        };

        match parse_inbound(&buf[..n]) {
            Ok(Inbound::Join { user, room }) if is_valid_name(&user) => {
                let room = room.unwrap_or_else(|| default_room.to_string());
                match registry.join(session_id, &user, &room, tx.clone()) {
                    Ok(()) => {
                        send(tx, Outbound::joined(&room));
                        Some(room)
                    }
                    Err(JoinError::NameTaken) => {
                        send(tx, Outbound::error(reasons::NAME_TAKEN));
                        None
                    }
                }
            }
            Ok(Inbound::Join { .. }) => {
                send(tx, Outbound::error(reasons::MALFORMED));
                None
            }
            Ok(_) => {
                send(tx, Outbound::error(reasons::JOIN_EXPECTED));
                None
            }
            Err(_) => {
                send(tx, Outbound::error(reasons::MALFORMED));
                None
            }
        }
    }

    async fn active_loop(
        read_half: &mut tokio::net::tcp::OwnedReadHalf,
        registry: &Registry,
        session_id: SessionId,
        room: &str,
        tx: &mpsc::UnboundedSender<Bytes>,
        shutdown: &Notify,
    ) {
        let mut buf = [0u8; MAX_MESSAGE_BYTES];
        loop {
            let n = tokio::select! {
                result = read_half.read(&mut buf) => match result {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                },
                _ = shutdown.notified() => return,
            };

            let message = match parse_inbound(&buf[..n]) {
                Ok(message) => message,
                // Any decode error after AWAIT_JOIN closes silently, no reply.
                Err(_) => return,
            };

            match message {
                Inbound::Text { payload } => {
                    Self::broadcast_text(registry, session_id, room, &payload);
                }
                Inbound::ListRooms => {
                    let rooms = registry.list_rooms();
                    send(tx, Outbound::Event(Event::RoomList { rooms }));
                }
                Inbound::ListUsers => {
                    let users = registry.list_members(room);
                    send(tx, Outbound::Event(Event::UserList { users }));
                }
                Inbound::Leave => return,
                Inbound::Ping => send(tx, Outbound::Event(Event::Pong)),
                // A second `join` or any unrecognized type is ignored in ACTIVE.
                Inbound::Join { .. } | Inbound::Unknown => {}
            }
        }
    }

    fn broadcast_text(registry: &Registry, session_id: SessionId, room: &str, payload: &str) {
        let Some(sender_name) = find_name(registry, room, session_id) else {
            return;
        };
        let message = Outbound::Event(Event::Text {
            payload: format!("{sender_name}: {payload}"),
        });
        ControlBroadcaster::broadcast(registry, room, Some(session_id), &message);
    }
}

fn find_name(registry: &Registry, room: &str, session_id: SessionId) -> Option<String> {
    registry
        .peers_in_room(room, u64::MAX)
        .into_iter()
        .find(|p| p.session_id == session_id)
        .map(|p| p.name)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 32
}

fn send(tx: &mpsc::UnboundedSender<Bytes>, message: Outbound) {
    let _ = tx.send(Bytes::from(message.to_bytes()));
}

async fn writer_task(mut write_half: tokio::net::tcp::OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Bytes>) {
    while let Some(frame) = rx.recv().await {
        if write_half.write_all(&frame).await.is_err() {
            break;
        }
    }
}
