use super::state::AppState;
use crate::relay::{ClientConnection, SessionInfo};
use axum::{
    body::Bytes,
    extract::{Query, State, WebSocketUpgrade},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// Transcription model (defaults to the configured model)
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub active: usize,
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /ws
/// Upgrade to the browser-facing relay connection
pub async fn client_socket(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| ClientConnection::run(state, socket))
}

/// POST /transcriptions
/// Batch transcription of a complete recording. The body is the raw audio
/// file; the caller's bearer token is forwarded to the transcription API.
pub async fn transcribe_batch(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(credential) = credential else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "missing bearer token".to_string(),
            }),
        )
            .into_response();
    };

    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "empty audio body".to_string(),
            }),
        )
            .into_response();
    }

    let model = query
        .model
        .unwrap_or_else(|| state.config.upstream.default_model.clone());

    info!(
        "Batch transcription request ({} bytes, model {})",
        body.len(),
        model
    );

    match state.batch.transcribe(body.to_vec(), &model, &credential).await {
        Ok(text) => (StatusCode::OK, Json(BatchResponse { text })).into_response(),
        Err(e) => {
            error!("Batch transcription failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("transcription failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /sessions
/// List active relay sessions
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.list().await;
    (
        StatusCode::OK,
        Json(SessionsResponse {
            active: sessions.len(),
            sessions,
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
