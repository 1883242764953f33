use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::session::repository::SessionRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_repository: Arc<dyn SessionRepository>,
}

impl AppState {
    pub fn new(session_repository: Arc<dyn SessionRepository>) -> Self {
        Self { session_repository }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Token missing")]
    MissingToken,

    #[error("Unknown token")]
    UnknownToken(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": AppError::MissingToken.to_string() }),
            ),
            // The rejected token is echoed back to the caller
            AppError::UnknownToken(token) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unknown token", "token": token }),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": AppError::Internal.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
