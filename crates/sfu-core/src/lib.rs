//! Core SFU engine: the Registry, the control-session state machine, the
//! control broadcaster, and the media binder/forwarder hot loop.
//!
//! This crate is transport-agnostic about everything except its two
//! concrete sockets (TCP control, UDP media); see [`sfu_protocol`] for the
//! wire formats it parses and emits.

pub mod broadcaster;
pub mod control_session;
pub mod media_forwarder;
pub mod participant;
pub mod registry;
pub mod server;

pub use broadcaster::ControlBroadcaster;
pub use control_session::ControlSession;
pub use media_forwarder::MediaForwarder;
pub use participant::{Participant, SessionId};
pub use registry::{BindError, JoinError, Registry};
pub use server::Server;
