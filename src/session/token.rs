use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Session token taken from `?token=` or, failing that, `Authorization: Bearer`.
/// Never rejects; handlers decide what a missing token means.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestToken(pub Option<String>);

impl RequestToken {
    pub fn from_parts(parts: &Parts) -> Self {
        let from_query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token);

        if let Some(token) = from_query {
            debug!("Token taken from query string");
            return Self(Some(token));
        }

        let from_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);

        if from_header.is_some() {
            debug!("Token taken from Authorization Bearer header");
        }
        Self(from_header)
    }

    /// Token or the given fallback
    pub fn or(self, fallback: &str) -> String {
        self.0.unwrap_or_else(|| fallback.to_string())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
