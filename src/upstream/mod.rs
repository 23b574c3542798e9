//! Upstream side of the relay: one outbound streaming connection to the
//! remote transcription service per browser client, with protocol
//! translation in both directions.

pub mod protocol;
pub mod session;

pub use protocol::{
    ClientEvent, ErrorDetail, ServerEvent, SessionUpdate, TranscriptionParams, TurnDetection,
};
pub use session::{
    AudioSendOutcome, RealtimeTranscriber, UpstreamConfig, UpstreamEvent, UpstreamHandle,
    UpstreamState,
};
