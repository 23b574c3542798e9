use super::protocol::{ClientEvent, ServerEvent, SessionUpdate, TranscriptionParams, TurnDetection};
use crate::config::UpstreamSettings;
use crate::relay::TranscriptFrame;
use crate::transcribe::StreamingTranscriber;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type UpstreamSink = SplitSink<UpstreamSocket, Message>;

/// Audio frames buffered between the client loop and the session task.
/// When the upstream stalls long enough to fill this, frames are dropped
/// rather than blocking the inbound connection.
const AUDIO_CHANNEL_CAPACITY: usize = 1024;

/// Per-session settings taken from the client's start message
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub model: String,
    pub language: String,
    pub turn_detection: TurnDetection,
}

/// Connection lifecycle of one upstream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamState {
    Idle,
    Connecting,
    Configuring,
    Ready,
    Closed,
}

impl UpstreamState {
    /// Valid transitions: Idle → Connecting → Configuring → Ready, plus
    /// any non-closed state → Closed. Ready is never re-entered.
    pub fn can_transition(self, next: UpstreamState) -> bool {
        use UpstreamState::*;
        matches!(
            (self, next),
            (Idle, Connecting) | (Connecting, Configuring) | (Configuring, Ready)
        ) || (next == Closed && self != Closed)
    }
}

/// Events surfaced to the owning client connection
#[derive(Debug)]
pub enum UpstreamEvent {
    /// Session configured; buffered audio may now be flushed
    Ready,

    /// Translated transcript update (delta or completed)
    Transcript(TranscriptFrame),

    /// Error reported by the upstream service; does not imply closure
    Error(String),

    /// The upstream connection is gone, with a message for the browser
    Closed(String),
}

/// Outcome of handing one audio frame to the session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSendOutcome {
    /// Frame queued for the upstream connection
    Sent,

    /// Send buffer full; the frame was dropped but the session is alive
    DroppedFull,

    /// The session task has exited
    SessionGone,
}

/// Handle owned by the client connection. Dropping it (or calling `close`)
/// signals the session task to close the upstream socket.
pub struct UpstreamHandle {
    audio_tx: mpsc::Sender<Vec<u8>>,
    _task: JoinHandle<()>,
}

impl UpstreamHandle {
    #[cfg(test)]
    pub(crate) fn from_parts(audio_tx: mpsc::Sender<Vec<u8>>, task: JoinHandle<()>) -> Self {
        Self {
            audio_tx,
            _task: task,
        }
    }

    /// Forward one raw audio frame to the session task. A full buffer drops
    /// the frame instead of blocking the caller; logging the outcome is the
    /// caller's job, it knows the client.
    pub fn send_audio(&self, frame: Vec<u8>) -> AudioSendOutcome {
        match self.audio_tx.try_send(frame) {
            Ok(()) => AudioSendOutcome::Sent,
            Err(TrySendError::Full(_)) => AudioSendOutcome::DroppedFull,
            Err(TrySendError::Closed(_)) => AudioSendOutcome::SessionGone,
        }
    }

    /// Request shutdown of the upstream connection. Idempotent by
    /// construction: consuming the handle drops the audio channel, and the
    /// session task closes its socket exactly once.
    pub fn close(self) {
        drop(self.audio_tx);
    }
}

/// Streaming backend speaking the realtime WebSocket protocol
pub struct RealtimeTranscriber {
    settings: UpstreamSettings,
}

impl RealtimeTranscriber {
    pub fn new(settings: UpstreamSettings) -> Self {
        Self { settings }
    }

    fn build_request(&self, credential: &str) -> Result<Request> {
        let mut request = self
            .settings
            .url
            .as_str()
            .into_client_request()
            .context("invalid upstream url")?;

        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {credential}"))
                .context("credential is not a valid header value")?,
        );
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        Ok(request)
    }
}

#[async_trait]
impl StreamingTranscriber for RealtimeTranscriber {
    async fn open_session(
        &self,
        client_id: Uuid,
        config: UpstreamConfig,
        credential: &str,
        events: mpsc::Sender<UpstreamEvent>,
    ) -> Result<UpstreamHandle> {
        let request = self.build_request(credential)?;
        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);

        let session = UpstreamSession {
            client_id,
            config,
            state: UpstreamState::Idle,
            handshake_timeout: Duration::from_secs(self.settings.handshake_timeout_secs),
            events,
        };

        let task = tokio::spawn(session.run(request, audio_rx));

        Ok(UpstreamHandle {
            audio_tx,
            _task: task,
        })
    }
}

/// One outbound streaming connection to the transcription service
struct UpstreamSession {
    client_id: Uuid,
    config: UpstreamConfig,
    state: UpstreamState,
    handshake_timeout: Duration,
    events: mpsc::Sender<UpstreamEvent>,
}

impl UpstreamSession {
    fn set_state(&mut self, next: UpstreamState) {
        if !self.state.can_transition(next) {
            warn!(
                "Client {}: rejected upstream transition {:?} -> {:?}",
                self.client_id, self.state, next
            );
            return;
        }
        debug!(
            "Client {}: upstream {:?} -> {:?}",
            self.client_id, self.state, next
        );
        self.state = next;
    }

    async fn run(mut self, request: Request, mut audio_rx: mpsc::Receiver<Vec<u8>>) {
        let socket = match tokio::time::timeout(self.handshake_timeout, self.establish(request))
            .await
        {
            Ok(Ok(socket)) => socket,
            Ok(Err(e)) => {
                error!("Client {}: upstream connect failed: {}", self.client_id, e);
                self.abort_handshake(format!("failed to reach the transcription service: {e}"))
                    .await;
                return;
            }
            Err(_) => {
                error!(
                    "Client {}: upstream handshake timed out after {:?}",
                    self.client_id, self.handshake_timeout
                );
                self.abort_handshake("transcription service handshake timed out".to_string())
                    .await;
                return;
            }
        };

        // Readiness is signalled only now, after the configuration message
        // is on the wire: the service rejects audio sent before its session
        // is configured.
        self.set_state(UpstreamState::Ready);
        let _ = self.events.send(UpstreamEvent::Ready).await;
        info!(
            "Client {}: upstream session ready (model {}, language {})",
            self.client_id, self.config.model, self.config.language
        );

        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                frame = audio_rx.recv() => match frame {
                    Some(frame) => self.forward_audio(&mut sink, &frame).await,
                    None => {
                        // Client side tore down; close our half.
                        self.set_state(UpstreamState::Closed);
                        if let Err(e) = sink.close().await {
                            debug!("Client {}: upstream close failed: {}", self.client_id, e);
                        }
                        info!("Client {}: upstream session closed", self.client_id);
                        return;
                    }
                },
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_server_event(&text).await,
                    Some(Ok(Message::Close(_))) | None => {
                        self.set_state(UpstreamState::Closed);
                        info!("Client {}: upstream closed the connection", self.client_id);
                        let _ = self
                            .events
                            .send(UpstreamEvent::Closed(
                                "the transcription service closed the connection".to_string(),
                            ))
                            .await;
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.set_state(UpstreamState::Closed);
                        warn!("Client {}: upstream read error: {}", self.client_id, e);
                        let _ = self
                            .events
                            .send(UpstreamEvent::Closed(
                                "lost the connection to the transcription service".to_string(),
                            ))
                            .await;
                        return;
                    }
                },
            }
        }
    }

    /// Connect and send the one-time session configuration
    async fn establish(&mut self, request: Request) -> Result<UpstreamSocket> {
        self.set_state(UpstreamState::Connecting);
        let (mut socket, _response) = connect_async(request)
            .await
            .context("upstream websocket handshake failed")?;

        self.set_state(UpstreamState::Configuring);
        let update = ClientEvent::SessionUpdate {
            session: SessionUpdate {
                input_audio_format: "pcm16".to_string(),
                input_audio_transcription: TranscriptionParams {
                    model: self.config.model.clone(),
                    language: self.config.language.clone(),
                },
                turn_detection: self.config.turn_detection.clone(),
            },
        };
        let payload =
            serde_json::to_string(&update).context("failed to serialize session configuration")?;
        socket
            .send(Message::Text(payload))
            .await
            .context("failed to send session configuration")?;

        Ok(socket)
    }

    /// Tell the browser a handshake failure terminated the session. Both an
    /// error frame and a closed notice go out, so the client is never left
    /// waiting after its start acknowledgement.
    async fn abort_handshake(&mut self, message: String) {
        self.set_state(UpstreamState::Closed);
        let _ = self.events.send(UpstreamEvent::Error(message)).await;
        let _ = self
            .events
            .send(UpstreamEvent::Closed(
                "transcription session could not be started".to_string(),
            ))
            .await;
    }

    /// Re-encode one raw PCM frame as a base64 append message. Failures are
    /// logged, not raised: the caller is on the flush path or has already
    /// checked readiness.
    async fn forward_audio(&mut self, sink: &mut UpstreamSink, frame: &[u8]) {
        if self.state != UpstreamState::Ready {
            warn!(
                "Client {}: dropping audio frame, upstream not ready",
                self.client_id
            );
            return;
        }

        let append = ClientEvent::AudioAppend {
            audio: base64::engine::general_purpose::STANDARD.encode(frame),
        };
        let payload = match serde_json::to_string(&append) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    "Client {}: failed to serialize audio append: {}",
                    self.client_id, e
                );
                return;
            }
        };

        if let Err(e) = sink.send(Message::Text(payload)).await {
            warn!(
                "Client {}: failed to forward audio frame upstream: {}",
                self.client_id, e
            );
        }
    }

    /// Dispatch one upstream text frame by its type discriminator
    async fn handle_server_event(&self, text: &str) {
        let event = match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    "Client {}: dropping unparseable upstream message: {}",
                    self.client_id, e
                );
                return;
            }
        };

        match event {
            ServerEvent::TranscriptionDelta { delta } => {
                self.emit_transcript(delta, false).await;
            }
            ServerEvent::TranscriptionCompleted { transcript } => {
                self.emit_transcript(transcript, true).await;
            }
            ServerEvent::Error { error } => {
                let message = error
                    .message
                    .unwrap_or_else(|| "the transcription service reported an error".to_string());
                warn!("Client {}: upstream error: {}", self.client_id, message);
                let _ = self.events.send(UpstreamEvent::Error(message)).await;
            }
            ServerEvent::Other => {
                debug!("Client {}: ignoring unhandled upstream event", self.client_id);
            }
        }
    }

    /// Emit a transcript event for non-empty trimmed text only
    async fn emit_transcript(&self, text: Option<String>, is_final: bool) {
        let Some(text) = text else { return };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        let frame = TranscriptFrame {
            text: trimmed.to_string(),
            is_final,
        };
        let _ = self.events.send(UpstreamEvent::Transcript(frame)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_audio_reports_full_buffer_and_closed_session() {
        let (audio_tx, audio_rx) = mpsc::channel(1);
        let handle = UpstreamHandle::from_parts(audio_tx, tokio::spawn(async {}));

        assert_eq!(handle.send_audio(vec![1]), AudioSendOutcome::Sent);
        assert_eq!(handle.send_audio(vec![2]), AudioSendOutcome::DroppedFull);

        drop(audio_rx);
        assert_eq!(handle.send_audio(vec![3]), AudioSendOutcome::SessionGone);
    }
}
