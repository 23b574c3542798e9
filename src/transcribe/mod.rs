//! Transcription backend capability traits
//!
//! Two ways to reach the hosted transcription service:
//! - `StreamingTranscriber`: a realtime WebSocket session producing
//!   delta/completed transcript events as audio arrives
//! - `BatchTranscriber`: a one-shot REST call over a complete recording
//!
//! Handlers hold trait objects for both, so the choice of backend never
//! leaks into the call stack.

pub mod batch;

pub use batch::OpenAiBatch;

use crate::upstream::{UpstreamConfig, UpstreamEvent, UpstreamHandle};
use anyhow::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait StreamingTranscriber: Send + Sync {
    /// Open one upstream session for a client. The returned handle accepts
    /// raw audio frames; connection progress, transcripts, and errors are
    /// reported through the events channel.
    async fn open_session(
        &self,
        client_id: Uuid,
        config: UpstreamConfig,
        credential: &str,
        events: mpsc::Sender<UpstreamEvent>,
    ) -> Result<UpstreamHandle>;
}

#[async_trait::async_trait]
pub trait BatchTranscriber: Send + Sync {
    /// Transcribe a complete audio recording in one request. The audio
    /// bytes are forwarded as-is; no decoding happens here.
    async fn transcribe(&self, audio: Vec<u8>, model: &str, credential: &str) -> Result<String>;
}
