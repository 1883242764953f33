// Library crate for the session lab server
// This file exposes the public API for integration tests

pub mod config;
pub mod session;
pub mod shared;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

// Re-export commonly used types for easier access in tests
pub use config::LabConfig;
pub use session::{
    models::{AuthResponse, User},
    repository::{InsecureSessionRepository, SessionRepository},
    AuthService,
};
pub use shared::{AppError, AppState};

/// Builds the HTTP router over the given state
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(session::login))
        .route("/api/user", get(session::current_user))
        .route("/api/profile", put(session::update_profile))
        .route("/api/logout", post(session::logout))
        .route("/api/debug/sessions", get(session::debug_sessions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
