use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Process-wide unique handle for one accepted control connection: a
/// reference to the reliable transport endpoint, set at join and cleared at
/// teardown. Identified by a monotonically increasing counter rather than
/// the `TcpStream` itself so the Registry can index and compare it cheaply.
pub type SessionId = u64;

/// A joined participant. Mutated in place (only `media_endpoint` ever
/// changes after construction) rather than replaced, so every index that
/// points at it keeps seeing the same record.
#[derive(Clone)]
pub struct Participant {
    pub session_id: SessionId,
    pub name: String,
    pub room: String,
    /// Outbound channel to this participant's ControlSession writer task.
    /// Sending never blocks and never holds the Registry lock.
    pub control_tx: mpsc::UnboundedSender<Bytes>,
    pub media_endpoint: Option<SocketAddr>,
}

impl Participant {
    pub fn new(
        session_id: SessionId,
        name: String,
        room: String,
        control_tx: mpsc::UnboundedSender<Bytes>,
    ) -> Self {
        Self {
            session_id,
            name,
            room,
            control_tx,
            media_endpoint: None,
        }
    }

    /// Best-effort send of one control-channel frame. Failures are isolated
    /// to this participant: the sender's own session will observe the
    /// failure independently.
    pub fn send_control(&self, frame: Bytes) {
        if self.control_tx.send(frame).is_err() {
            tracing::debug!(
                session_id = self.session_id,
                name = %self.name,
                "control send failed: peer writer task is gone"
            );
        }
    }
}
