use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Browser relay connection
        .route("/ws", get(handlers::client_socket))
        // Batch transcription
        .route("/transcriptions", post(handlers::transcribe_batch))
        // Session listing
        .route("/sessions", get(handlers::list_sessions))
        // Browser clients connect cross-origin, same as the health endpoint
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
