use bytes::Bytes;
use sfu_protocol::control::Outbound;

use crate::participant::SessionId;
use crate::registry::Registry;

/// Fans one framed control message out to a room, optionally excluding one
/// participant.
///
/// Takes a snapshot of the room under the Registry's lock and writes outside
/// it; a write failure to one peer never affects the others, since each
/// write is just an isolated channel send that never raises.
pub struct ControlBroadcaster;

impl ControlBroadcaster {
    pub fn broadcast(registry: &Registry, room: &str, excluding: Option<SessionId>, message: &Outbound) {
        let frame = Bytes::from(message.to_bytes());
        let peers = registry.peers_in_room(room, excluding.unwrap_or(SessionId::MAX));
        for peer in peers {
            peer.send_control(frame.clone());
        }
    }
}
