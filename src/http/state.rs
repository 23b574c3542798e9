use crate::config::Config;
use crate::relay::SessionRegistry;
use crate::transcribe::{BatchTranscriber, OpenAiBatch, StreamingTranscriber};
use crate::upstream::RealtimeTranscriber;
use std::sync::Arc;

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Active client sessions (ClientId → session info)
    pub sessions: SessionRegistry,

    /// Realtime backend used by relay connections
    pub streaming: Arc<dyn StreamingTranscriber>,

    /// One-shot backend used by the batch endpoint
    pub batch: Arc<dyn BatchTranscriber>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let streaming = Arc::new(RealtimeTranscriber::new(config.upstream.clone()));
        let batch = Arc::new(OpenAiBatch::new(config.upstream.rest_url.clone()));

        Self {
            config: Arc::new(config),
            sessions: SessionRegistry::new(),
            streaming,
            batch,
        }
    }
}
