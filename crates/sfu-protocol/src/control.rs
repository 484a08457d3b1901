//! Control-channel message types.
//!
//! Each message is a single UTF-8 JSON object; the reference server treats
//! every socket read as exactly one message (see the crate-level docs).

use serde::{Deserialize, Serialize};

/// A message received from a client on the control channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Join {
        user: String,
        /// Absent means "use the server's configured default room";
        /// this crate has no opinion on what that default is.
        #[serde(default)]
        room: Option<String>,
    },
    Text {
        payload: String,
    },
    ListRooms,
    ListUsers,
    Leave,
    Ping,
    /// Any recognized-JSON message whose `type` isn't one of the above.
    /// `ACTIVE` sessions ignore these silently; `AWAIT_JOIN` sessions treat
    /// them as "join expected".
    #[serde(other)]
    Unknown,
}

/// Parse one control message from a raw socket read.
///
/// Returns [`ControlParseError::Malformed`] for anything that isn't a valid
/// JSON object matching the `Inbound` shape at all (bad syntax, missing
/// fields on a recognized type). A recognized-but-unsupported `type` value
/// parses successfully as [`Inbound::Unknown`] rather than erroring, per the
/// distinction the reference server draws between "garbled" and "valid but
/// not acted upon".
pub fn parse_inbound(bytes: &[u8]) -> Result<Inbound, ControlParseError> {
    serde_json::from_slice(bytes).map_err(|_| ControlParseError::Malformed)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControlParseError {
    #[error("malformed control message")]
    Malformed,
}

/// A message sent to a client on the control channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Joined { status: &'static str, room: String },
    Error { error: String },
    Event(Event),
}

impl Outbound {
    pub fn joined(room: impl Into<String>) -> Self {
        Outbound::Joined {
            status: "joined",
            room: room.into(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Outbound::Error {
            error: reason.into(),
        }
    }

    /// Serialize to the exact bytes written to the socket.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Outbound always serializes")
    }
}

/// Event-shaped messages, all carrying an explicit `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Text { payload: String },
    RoomList { rooms: Vec<String> },
    UserList { users: Vec<String> },
    Pong,
}

/// Localized error reasons, kept in Russian for wire compatibility with
/// existing clients.
pub mod reasons {
    pub const NAME_TAKEN: &str = "Имя уже занято";
    pub const JOIN_EXPECTED: &str = "Ожидался join";
    pub const MALFORMED: &str = "Некорректный JSON";
}
