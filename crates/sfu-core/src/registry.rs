use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::participant::{Participant, SessionId};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("name already taken")]
    NameTaken,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BindError {
    #[error("no participant with that name")]
    Unknown,
    #[error("participant already has a media endpoint")]
    AlreadyBound,
}

/// One canonical store of participants, plus three secondary indices kept
/// consistent under a single lock.
///
/// One coarse lock instead of per-index locks rules out the class of bug
/// where UDP and TCP observe different membership snapshots mid-mutation:
/// every join, bind, and leave updates all relevant indices atomically.
struct Inner {
    participants: HashMap<SessionId, Participant>,
    by_name: HashMap<String, SessionId>,
    by_endpoint: HashMap<SocketAddr, SessionId>,
    rooms: HashMap<String, HashSet<SessionId>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            participants: HashMap::new(),
            by_name: HashMap::new(),
            by_endpoint: HashMap::new(),
            rooms: HashMap::new(),
        }
    }
}

/// Process-wide directory of participants and rooms.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Atomic: fails with `NameTaken` and mutates nothing if `name` is
    /// already indexed. Otherwise inserts into all indices and creates the
    /// room if needed. Room membership is immediate; media binding happens
    /// independently and later, once the participant's first datagram
    /// arrives.
    pub fn join(
        &self,
        session_id: SessionId,
        name: &str,
        room: &str,
        control_tx: mpsc::UnboundedSender<Bytes>,
    ) -> Result<(), JoinError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.by_name.contains_key(name) {
            return Err(JoinError::NameTaken);
        }
        let participant = Participant::new(session_id, name.to_string(), room.to_string(), control_tx);
        inner.by_name.insert(name.to_string(), session_id);
        inner
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(session_id);
        inner.participants.insert(session_id, participant);
        Ok(())
    }

    /// Atomic: sets `media_endpoint` the first time a name's datagram
    /// arrives; a second attempt (from the legitimate owner re-sending its
    /// binding datagram, or a spoof) fails `AlreadyBound` and is ignored by
    /// the caller.
    pub fn bind_media(&self, name: &str, endpoint: SocketAddr) -> Result<(), BindError> {
        let mut inner = self.inner.lock().unwrap();
        let session_id = *inner.by_name.get(name).ok_or(BindError::Unknown)?;
        let already_bound = inner
            .participants
            .get(&session_id)
            .map(|p| p.media_endpoint.is_some())
            .unwrap_or(true);
        if already_bound {
            return Err(BindError::AlreadyBound);
        }
        if let Some(p) = inner.participants.get_mut(&session_id) {
            p.media_endpoint = Some(endpoint);
        }
        inner.by_endpoint.insert(endpoint, session_id);
        Ok(())
    }

    pub fn lookup_by_endpoint(&self, endpoint: SocketAddr) -> Option<Participant> {
        let inner = self.inner.lock().unwrap();
        let session_id = *inner.by_endpoint.get(&endpoint)?;
        inner.participants.get(&session_id).cloned()
    }

    /// Snapshot suitable for iteration without holding the lock during
    /// fan-out.
    pub fn peers_in_room(&self, room: &str, excluding: SessionId) -> Vec<Participant> {
        let inner = self.inner.lock().unwrap();
        let Some(members) = inner.rooms.get(room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|&&id| id != excluding)
            .filter_map(|id| inner.participants.get(id).cloned())
            .collect()
    }

    /// Atomic removal from all indices. Removes the room if it becomes
    /// empty so empty rooms are never observable.
    pub fn leave(&self, session_id: SessionId) -> Option<Participant> {
        let mut inner = self.inner.lock().unwrap();
        let participant = inner.participants.remove(&session_id)?;
        inner.by_name.remove(&participant.name);
        if let Some(endpoint) = participant.media_endpoint {
            inner.by_endpoint.remove(&endpoint);
        }
        if let Some(members) = inner.rooms.get_mut(&participant.room) {
            members.remove(&session_id);
            if members.is_empty() {
                inner.rooms.remove(&participant.room);
            }
        }
        Some(participant)
    }

    pub fn list_rooms(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.rooms.keys().cloned().collect()
    }

    pub fn list_members(&self, room: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let Some(members) = inner.rooms.get(room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| inner.participants.get(id).map(|p| p.name.clone()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
