use anyhow::Result;
use serde::Deserialize;

/// Service configuration, loaded from an optional file with environment
/// overrides (e.g. RELAY__SERVICE__HTTP__PORT=8080).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub upstream: UpstreamSettings,
    pub relay: RelaySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Realtime WebSocket endpoint of the transcription service
    pub url: String,

    /// REST API base used by the batch transcription endpoint
    pub rest_url: String,

    /// Model used when the client's start message does not name one
    pub default_model: String,

    /// Transcription language requested in the session configuration
    pub language: String,

    /// Bound on the connect + configure phase of an upstream session
    pub handshake_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Maximum audio frames buffered while the upstream session is not yet
    /// ready; the oldest frame is dropped on overflow.
    pub max_pending_frames: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "stt-relay".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: "wss://api.openai.com/v1/realtime?intent=transcription".to_string(),
            rest_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4o-transcribe".to_string(),
            language: "ja".to_string(),
            handshake_timeout_secs: 10,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            max_pending_frames: 512, // ~80s of 100ms frames
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
