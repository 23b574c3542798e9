//! Browser-facing side of the relay
//!
//! This module owns everything between an inbound WebSocket and the upstream
//! session that serves it:
//! - wire message types for the browser protocol
//! - the per-client connection loop (control/audio classification, the
//!   pending-audio queue, transcript fan-out)
//! - the ClientId → session registry

pub mod connection;
pub mod messages;
pub mod registry;

pub use connection::ClientConnection;
pub use messages::{ClientControl, ControlReply, ServerMessage, TranscriptFrame};
pub use registry::{SessionInfo, SessionRegistry};
