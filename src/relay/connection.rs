use super::messages::{ClientControl, ControlReply, ServerMessage};
use crate::http::AppState;
use crate::upstream::{
    AudioSendOutcome, TurnDetection, UpstreamConfig, UpstreamEvent, UpstreamHandle,
};
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outbound messages queued towards one browser connection
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// One browser connection and the upstream session serving it
///
/// Classifies inbound frames (JSON control vs. binary audio), buffers audio
/// that arrives before the upstream session is ready, and forwards translated
/// transcript events back to the browser.
pub struct ClientConnection {
    id: Uuid,
    state: AppState,
    upstream: Option<UpstreamHandle>,
    upstream_ready: bool,
    pending: VecDeque<Vec<u8>>,
    dropped_frames: u64,
}

impl ClientConnection {
    /// Serve one accepted WebSocket until either side disconnects, then
    /// tear down the paired upstream session in the same step.
    pub async fn run(state: AppState, socket: WebSocket) {
        let id = state.sessions.register().await;

        let mut connection = Self {
            id,
            state: state.clone(),
            upstream: None,
            upstream_ready: false,
            pending: VecDeque::new(),
            dropped_frames: 0,
        };

        if let Err(e) = connection.serve(socket).await {
            error!("Client {}: connection failed: {}", id, e);
        }

        connection.teardown();
        state.sessions.deregister(id).await;
    }

    async fn serve(&mut self, socket: WebSocket) -> Result<()> {
        let (sender, mut receiver) = socket.split();

        let (out_tx, out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CHANNEL_CAPACITY);
        let writer = tokio::spawn(write_loop(sender, out_rx));

        // Upstream session tasks report back through this channel. One local
        // sender stays alive here so a replacement session (after an
        // upstream drop) can reuse it.
        let (event_tx, mut event_rx) = mpsc::channel::<UpstreamEvent>(OUTBOUND_CHANNEL_CAPACITY);

        loop {
            tokio::select! {
                message = receiver.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_control(&text, &out_tx, &event_tx).await;
                    }
                    Some(Ok(Message::Binary(frame))) => {
                        self.handle_audio(frame);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong, nothing to do
                    Some(Err(e)) => {
                        warn!("Client {}: read error: {}", self.id, e);
                        break;
                    }
                },
                Some(event) = event_rx.recv() => {
                    self.handle_upstream_event(event, &out_tx).await;
                }
            }
        }

        // Flush queued replies before the writer goes away.
        drop(out_tx);
        let _ = writer.await;

        Ok(())
    }

    /// Handle one JSON control message from the browser
    async fn handle_control(
        &mut self,
        text: &str,
        out_tx: &mpsc::Sender<ServerMessage>,
        event_tx: &mpsc::Sender<UpstreamEvent>,
    ) {
        let value = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => value,
            Err(e) => {
                warn!("Client {}: dropping unparseable control message: {}", self.id, e);
                let _ = out_tx
                    .send(ServerMessage::Reply(ControlReply::Error {
                        message: format!("unrecognized control message: {e}"),
                    }))
                    .await;
                return;
            }
        };

        // Valid JSON that is not a control message we know is the client
        // talking past us, not a broken stream: log and drop, no reply.
        let control = match serde_json::from_value::<ClientControl>(value) {
            Ok(control) => control,
            Err(e) => {
                warn!("Client {}: ignoring unknown control message: {}", self.id, e);
                return;
            }
        };

        let ClientControl::Start {
            api_key,
            model,
            language,
        } = control;

        // Only one active upstream per client: a second start is
        // acknowledged but opens nothing.
        if self.upstream.is_some() {
            warn!(
                "Client {}: start received while a session is already open, ignoring",
                self.id
            );
            let _ = out_tx
                .send(ServerMessage::Reply(ControlReply::StartAcknowledgement))
                .await;
            return;
        }

        let Some(credential) = api_key.filter(|key| !key.is_empty()) else {
            // Caller error, not ours: acknowledge, log, attempt nothing.
            warn!(
                "Client {}: start without an API key, no upstream session opened",
                self.id
            );
            let _ = out_tx
                .send(ServerMessage::Reply(ControlReply::StartAcknowledgement))
                .await;
            return;
        };

        let config = UpstreamConfig {
            model: model.unwrap_or_else(|| self.state.config.upstream.default_model.clone()),
            language: language.unwrap_or_else(|| self.state.config.upstream.language.clone()),
            turn_detection: TurnDetection::default(),
        };

        info!(
            "Client {}: starting upstream session (model {})",
            self.id, config.model
        );

        // The start itself is well-formed, so it is acknowledged up front;
        // a session that cannot be opened reports its own error frame.
        let _ = out_tx
            .send(ServerMessage::Reply(ControlReply::StartAcknowledgement))
            .await;

        match self
            .state
            .streaming
            .open_session(self.id, config, &credential, event_tx.clone())
            .await
        {
            Ok(handle) => {
                self.upstream = Some(handle);
            }
            Err(e) => {
                error!("Client {}: could not open upstream session: {}", self.id, e);
                let _ = out_tx
                    .send(ServerMessage::Reply(ControlReply::Error {
                        message: format!("could not start a transcription session: {e}"),
                    }))
                    .await;
            }
        }
    }

    /// Route one binary audio frame: forward when the upstream session is
    /// ready, otherwise buffer it in arrival order.
    fn handle_audio(&mut self, frame: Vec<u8>) {
        if self.upstream_ready {
            if let Some(handle) = &self.upstream {
                match handle.send_audio(frame) {
                    AudioSendOutcome::Sent => {}
                    AudioSendOutcome::DroppedFull => {
                        warn!("Client {}: upstream send buffer full, dropped audio frame", self.id);
                    }
                    AudioSendOutcome::SessionGone => {
                        warn!("Client {}: upstream session gone, dropping audio frame", self.id);
                    }
                }
                return;
            }
        }

        let limit = self.state.config.relay.max_pending_frames;
        if self.pending.len() >= limit {
            self.pending.pop_front();
            self.dropped_frames += 1;
            warn!(
                "Client {}: pending audio queue full ({} frames), dropped oldest ({} dropped total)",
                self.id, limit, self.dropped_frames
            );
        }
        self.pending.push_back(frame);
    }

    async fn handle_upstream_event(
        &mut self,
        event: UpstreamEvent,
        out_tx: &mpsc::Sender<ServerMessage>,
    ) {
        match event {
            UpstreamEvent::Ready => {
                // One-time transition: a duplicate readiness event must not
                // re-run the flush.
                if self.upstream_ready {
                    warn!("Client {}: duplicate readiness event, ignoring", self.id);
                    return;
                }
                self.upstream_ready = true;
                self.flush_pending();
            }
            UpstreamEvent::Transcript(frame) => {
                let _ = out_tx.send(ServerMessage::Transcript(frame)).await;
            }
            UpstreamEvent::Error(message) => {
                let _ = out_tx
                    .send(ServerMessage::Reply(ControlReply::Error { message }))
                    .await;
            }
            UpstreamEvent::Closed(message) => {
                // The session task has already shut down; drop the handle so
                // a later start may open a fresh session.
                self.upstream = None;
                self.upstream_ready = false;
                let _ = out_tx
                    .send(ServerMessage::Reply(ControlReply::ConnectionClosed { message }))
                    .await;
            }
        }
    }

    /// Drain the pending queue to the upstream session in arrival order
    fn flush_pending(&mut self) {
        let Some(handle) = &self.upstream else { return };
        if self.pending.is_empty() {
            return;
        }

        let frames = std::mem::take(&mut self.pending);
        let count = frames.len();
        let mut dropped = 0usize;
        for frame in frames {
            match handle.send_audio(frame) {
                AudioSendOutcome::Sent => {}
                AudioSendOutcome::DroppedFull => dropped += 1,
                AudioSendOutcome::SessionGone => {
                    warn!("Client {}: upstream session gone mid-flush", self.id);
                    return;
                }
            }
        }
        if dropped > 0 {
            warn!(
                "Client {}: upstream send buffer full during flush, dropped {} of {} frames",
                self.id, dropped, count
            );
        }
        info!("Client {}: flushed {} buffered audio frames", self.id, count);
    }

    /// Close the paired upstream session, if any
    fn teardown(&mut self) {
        if let Some(handle) = self.upstream.take() {
            handle.close();
        }
    }
}

/// Serialize and write outbound messages; transcript events for a closed
/// browser connection are silently dropped.
async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = out_rx.recv().await {
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize outbound message: {}", e);
                continue;
            }
        };

        if sender.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
