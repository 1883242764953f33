use axum::{
    extract::State,
    http::{
        header::{CONTENT_TYPE, SET_COOKIE, USER_AGENT},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::User,
    service::{AuthService, ANONYMOUS},
    token::RequestToken,
};
use crate::shared::{AppError, AppState};

pub const AUTH_COOKIE: &str = "auth_token";
pub const DEBUG_TOKEN_HEADER: &str = "x-debug-token";
pub const ENCODED_PASSWORD_HEADER: &str = "x-encoded-password";

/// Request payload for login. Missing fields fall back to lab defaults.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_username() -> String {
    "guest".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_bytes(value.as_bytes()).map_err(|e| {
        warn!(error = %e, "Value cannot be sent as a header");
        AppError::Internal
    })
}

/// HTTP handler for logging in
///
/// POST /api/login
/// Returns the auth response and exposes the token in a script-readable
/// cookie plus debug headers
#[instrument(name = "login", skip(state, headers, request))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let context = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    let service = AuthService::new(Arc::clone(&state.session_repository));
    let auth = service
        .login(&request.username, &request.password, context)
        .await;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        header_value(&format!("{}={}; Path=/", AUTH_COOKIE, auth.token))?,
    );
    response_headers.insert(DEBUG_TOKEN_HEADER, header_value(&auth.token)?);
    response_headers.insert(
        ENCODED_PASSWORD_HEADER,
        header_value(&auth.encoded_password)?,
    );

    info!(username = %auth.user.username(), "Login succeeded");

    Ok((response_headers, Json(auth)))
}

/// HTTP handler for fetching the user behind a token
///
/// GET /api/user
#[instrument(name = "current_user", skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    token: RequestToken,
) -> Result<Json<User>, AppError> {
    let token = token.0.ok_or(AppError::MissingToken)?;

    let service = AuthService::new(Arc::clone(&state.session_repository));
    match service.current_user(&token).await {
        Some(user) => Ok(Json(user)),
        None => {
            warn!(token = %token, "Unknown token");
            Err(AppError::UnknownToken(token))
        }
    }
}

/// HTTP handler for profile updates
///
/// PUT /api/profile
/// Requests without a token update the `anonymous` session
#[instrument(name = "update_profile", skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    token: RequestToken,
    Json(payload): Json<HashMap<String, String>>,
) -> Json<User> {
    let token = token.or(ANONYMOUS);

    let service = AuthService::new(Arc::clone(&state.session_repository));
    Json(service.update_profile(&token, &payload).await)
}

/// HTTP handler for logging out
///
/// POST /api/logout
/// Without a token nothing is removed
#[instrument(name = "logout", skip(state))]
pub async fn logout(State(state): State<AppState>, token: RequestToken) -> StatusCode {
    if let Some(token) = token.0 {
        let service = AuthService::new(Arc::clone(&state.session_repository));
        service.logout(&token).await;
    }

    StatusCode::NO_CONTENT
}

/// HTTP handler dumping every live session as plain text
///
/// GET /api/debug/sessions
#[instrument(name = "debug_sessions", skip(state))]
pub async fn debug_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let service = AuthService::new(Arc::clone(&state.session_repository));
    let dump = service.generate_session_debug_dump().await;

    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], dump)
}
