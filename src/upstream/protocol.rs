//! Wire types for the realtime transcription protocol
//!
//! The service expects exactly one `transcription_session.update` before any
//! audio, then `input_audio_buffer.append` text frames carrying base64 PCM.
//! It answers with delta/completed transcription events and `error` payloads.

use serde::{Deserialize, Serialize};

/// Messages the relay sends to the upstream service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "transcription_session.update")]
    SessionUpdate { session: SessionUpdate },

    #[serde(rename = "input_audio_buffer.append")]
    AudioAppend {
        /// Base64-encoded PCM16 bytes of one audio frame
        audio: String,
    },
}

/// Session configuration sent once after the socket opens
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub input_audio_format: String,
    pub input_audio_transcription: TranscriptionParams,
    pub turn_detection: TurnDetection,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionParams {
    pub model: String,
    pub language: String,
}

/// Server-side voice activity detection parameters
#[derive(Debug, Clone, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            kind: "server_vad".to_string(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Events the upstream service sends back
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    TranscriptionDelta { delta: Option<String> },

    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted { transcript: Option<String> },

    #[serde(rename = "error")]
    Error { error: ErrorDetail },

    /// Forward-compatible no-op for every other event type
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    pub message: Option<String>,
}
