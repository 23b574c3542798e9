use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Connected-client bookkeeping (ClientId → session info)
///
/// The registry is the only state shared across connections. Registration
/// happens at WebSocket accept time, deregistration when the connection loop
/// exits; the per-connection pipeline itself never touches another client's
/// state.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionInfo>>>,
}

/// Snapshot of one registered client session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub client_id: Uuid,
    pub connected_at: DateTime<Utc>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh client and return its ClientId
    pub async fn register(&self) -> Uuid {
        let client_id = Uuid::new_v4();
        let info = SessionInfo {
            client_id,
            connected_at: Utc::now(),
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(client_id, info);
        info!("Client connected: {} ({} active)", client_id, sessions.len());

        client_id
    }

    /// Remove a client session. Idempotent: traffic or teardown for an
    /// unknown ClientId is logged and dropped, never fatal.
    pub async fn deregister(&self, client_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&client_id).is_some() {
            info!(
                "Client disconnected: {} ({} active)",
                client_id,
                sessions.len()
            );
        } else {
            warn!("Deregister for unknown client {}, ignoring", client_id);
        }
    }

    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.values().cloned().collect()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
