use crate::auth::TokenIssuer;
use crate::web::api::ErrorResponse;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Authentication state holding the token issuer used to verify bearer tokens.
#[derive(Clone)]
pub struct AuthState {
    pub issuer: Arc<dyn TokenIssuer>,
}

impl AuthState {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self { issuer }
    }
}

/// Reasons a request is refused by [`require_bearer_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    #[error("Authorization header is required")]
    MissingHeader,
    #[error("Invalid authorization header format")]
    InvalidFormat,
    #[error("Invalid token")]
    InvalidToken,
}

impl IntoResponse for BearerError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(self.to_string())),
        )
            .into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
/// The value must be exactly two space-separated parts with the `Bearer` scheme.
pub fn parse_bearer(header_value: &str) -> Result<&str, BearerError> {
    if header_value.is_empty() {
        return Err(BearerError::MissingHeader);
    }
    let parts: Vec<&str> = header_value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(*token),
        _ => Err(BearerError::InvalidFormat),
    }
}

/// Middleware that rejects requests without a valid bearer token with UNAUTHORIZED.
pub async fn require_bearer_auth(
    State(state): State<Arc<AuthState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return BearerError::MissingHeader.into_response();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return BearerError::InvalidFormat.into_response();
    };
    let token = match parse_bearer(auth_str) {
        Ok(token) => token,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = state.issuer.verify(token) {
        tracing::warn!("Rejected bearer token: {}", err);
        return BearerError::InvalidToken.into_response();
    }

    next.run(request).await
}
