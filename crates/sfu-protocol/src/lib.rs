//! Wire formats shared by the control channel and the media channel.
//!
//! The control channel carries length-delimited (by the transport's own
//! receive boundaries, not a length prefix) UTF-8 JSON objects; see
//! [`control`]. The media channel carries fixed-layout UDP datagrams; see
//! [`media`].

pub mod control;
pub mod media;

pub use control::{Inbound, Outbound};
pub use media::{parse_datagram, MediaError, NAME_PREFIX_LEN};
