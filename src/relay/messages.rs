use serde::{Deserialize, Serialize};

/// Control messages the browser sends on the text channel
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientControl {
    /// Open an upstream transcription session for this connection
    Start {
        /// Bearer credential forwarded to the transcription service
        #[serde(rename = "apiKey")]
        api_key: Option<String>,

        /// Transcription model (falls back to the configured default)
        model: Option<String>,

        /// Transcription language (falls back to the configured default)
        language: Option<String>,
    },
}

/// Control replies the relay sends back to the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlReply {
    /// Reply to a `start` control message
    StartAcknowledgement,

    /// Relay-level or upstream-reported error
    Error { message: String },

    /// The upstream connection is gone while the browser side is still open
    ConnectionClosed { message: String },
}

/// A transcript update forwarded to the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFrame {
    pub text: String,

    /// False for incremental deltas, true for a finalized utterance
    #[serde(rename = "isFinal")]
    pub is_final: bool,
}

/// Everything the relay writes to the browser connection
#[derive(Debug, Clone)]
pub enum ServerMessage {
    Reply(ControlReply),
    Transcript(TranscriptFrame),
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            ServerMessage::Reply(reply) => serde_json::to_string(reply),
            ServerMessage::Transcript(frame) => serde_json::to_string(frame),
        }
    }
}
