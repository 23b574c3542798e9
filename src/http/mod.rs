//! HTTP and WebSocket server surface
//!
//! Routes:
//! - GET /ws - browser relay connection (WebSocket upgrade)
//! - POST /transcriptions - batch transcription of a complete recording
//! - GET /sessions - active relay sessions
//! - GET /health - liveness check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
