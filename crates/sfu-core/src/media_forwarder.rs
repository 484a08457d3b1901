use std::net::SocketAddr;
use std::sync::Arc;

use sfu_protocol::media::parse_datagram;
use tokio::net::UdpSocket;
use tokio::sync::Notify;

use crate::registry::{BindError, Registry};

/// Maximum UDP datagram the forwarder will read.
const MAX_DATAGRAM_BYTES: usize = 4096;

/// Single hot loop: receive, bind-if-new, fan out verbatim.
///
/// Runs as one dedicated task for the server's lifetime so the media socket
/// and the Registry snapshot it takes per datagram are never contended.
pub struct MediaForwarder {
    socket: Arc<UdpSocket>,
    registry: Arc<Registry>,
}

impl MediaForwarder {
    pub fn new(socket: Arc<UdpSocket>, registry: Arc<Registry>) -> Self {
        Self { socket, registry }
    }

    pub async fn run(&self, shutdown: Arc<Notify>) {
        let mut buf = [0u8; MAX_DATAGRAM_BYTES];
        loop {
            let (len, source) = tokio::select! {
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::debug!(error = %e, "media socket recv error, continuing");
                        continue;
                    }
                },
                _ = shutdown.notified() => {
                    tracing::info!("media forwarder shutting down");
                    return;
                }
            };

            self.handle_datagram(&buf[..len], source).await;
        }
    }

    async fn handle_datagram(&self, datagram: &[u8], source: SocketAddr) {
        let participant = match self.registry.lookup_by_endpoint(source) {
            Some(p) => p,
            None => match self.bind(datagram, source) {
                Some(p) => p,
                None => return,
            },
        };

        let peers = self
            .registry
            .peers_in_room(&participant.room, participant.session_id);
        for peer in peers {
            let Some(peer_endpoint) = peer.media_endpoint else {
                // Peer hasn't sent its own first media datagram yet; it
                // cannot receive until it does.
                continue;
            };
            if let Err(e) = self.socket.send_to(datagram, peer_endpoint).await {
                tracing::debug!(
                    sender = %source,
                    recipient = %peer_endpoint,
                    error = %e,
                    "media send failed, continuing with other peers"
                );
            }
        }
    }

    /// The first datagram from an unknown source address is an
    /// identification assertion binding that address to a joined name.
    /// Returns the now-bound participant, or `None` if the datagram should
    /// be dropped.
    fn bind(&self, datagram: &[u8], source: SocketAddr) -> Option<crate::participant::Participant> {
        let name = match parse_datagram(datagram) {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(source = %source, error = %e, "dropping unbindable datagram");
                return None;
            }
        };

        match self.registry.bind_media(&name, source) {
            Ok(()) => {
                tracing::info!(name = %name, endpoint = %source, "media endpoint bound");
                self.registry.lookup_by_endpoint(source)
            }
            Err(BindError::Unknown) => {
                tracing::debug!(name = %name, source = %source, "dropping media for unjoined name");
                None
            }
            Err(BindError::AlreadyBound) => {
                tracing::debug!(name = %name, source = %source, "dropping media: name already bound elsewhere");
                None
            }
        }
    }
}
