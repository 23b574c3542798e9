pub mod config;
pub mod http;
pub mod relay;
pub mod transcribe;
pub mod upstream;

pub use config::Config;
pub use http::{create_router, AppState};
pub use relay::{ClientConnection, ControlReply, SessionRegistry, TranscriptFrame};
pub use transcribe::{BatchTranscriber, OpenAiBatch, StreamingTranscriber};
pub use upstream::{
    AudioSendOutcome, RealtimeTranscriber, UpstreamConfig, UpstreamEvent, UpstreamHandle,
    UpstreamState,
};
