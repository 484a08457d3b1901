use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::control_session::ControlSession;
use crate::media_forwarder::MediaForwarder;
use crate::registry::Registry;

/// Owns the Registry, both listening sockets, and the set of live session
/// tasks for one server instance. Multiple `Server`s can coexist in one
/// process, each on its own ephemeral ports, which is what lets the test
/// suite spin up an isolated instance per scenario without a shared global.
pub struct Server {
    registry: Arc<Registry>,
    control_listener: TcpListener,
    media_socket: Arc<UdpSocket>,
    default_room: Arc<str>,
    next_session_id: AtomicU64,
    acceptor_shutdown: Arc<Notify>,
    session_shutdown: Arc<Notify>,
    forwarder_shutdown: Arc<Notify>,
}

impl Server {
    /// Bind both transports to the given addresses. Pass port `0` to let
    /// the OS choose, useful for tests. `default_room` is the room a
    /// `join` with no `room` field lands in.
    pub async fn bind(
        control_addr: SocketAddr,
        media_addr: SocketAddr,
        default_room: impl Into<Arc<str>>,
    ) -> std::io::Result<Self> {
        let control_listener = TcpListener::bind(control_addr).await?;
        let media_socket = Arc::new(UdpSocket::bind(media_addr).await?);
        Ok(Self {
            registry: Arc::new(Registry::new()),
            control_listener,
            media_socket,
            default_room: default_room.into(),
            next_session_id: AtomicU64::new(0),
            acceptor_shutdown: Arc::new(Notify::new()),
            session_shutdown: Arc::new(Notify::new()),
            forwarder_shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn control_local_addr(&self) -> std::io::Result<SocketAddr> {
        self.control_listener.local_addr()
    }

    pub fn media_local_addr(&self) -> std::io::Result<SocketAddr> {
        self.media_socket.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Run the acceptor loop and the media forwarder until `shutdown` is
    /// called. Returns once both have wound down.
    pub async fn run(self: Arc<Self>) {
        let mut sessions = JoinSet::new();
        let forwarder = {
            let forwarder = MediaForwarder::new(self.media_socket.clone(), self.registry.clone());
            let shutdown = self.forwarder_shutdown.clone();
            tokio::spawn(async move { forwarder.run(shutdown).await })
        };

        loop {
            tokio::select! {
                accepted = self.control_listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => {
                            let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(session_id, %peer_addr, "control connection accepted");
                            let registry = self.registry.clone();
                            let default_room = self.default_room.clone();
                            let shutdown = self.session_shutdown.clone();
                            sessions.spawn(async move {
                                ControlSession::run(stream, session_id, registry, default_room, shutdown).await
                            });
                        }
                        Err(e) => {
                            tracing::debug!(error = %e, "accept error, continuing");
                        }
                    }
                }
                _ = self.acceptor_shutdown.notified() => break,
            }
        }

        // Acceptor is down; now let every live session wind down.
        self.session_shutdown.notify_waiters();
        while sessions.join_next().await.is_some() {}

        // Finally stop the forwarder.
        self.forwarder_shutdown.notify_waiters();
        let _ = forwarder.await;
    }

    /// Signal graceful shutdown: acceptor first, then sessions, then the
    /// forwarder. `run`'s own loop performs the ordering; this just
    /// triggers the first step.
    pub fn shutdown(&self) {
        self.acceptor_shutdown.notify_waiters();
    }
}
