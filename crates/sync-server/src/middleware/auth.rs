//! Authentication middleware
//!
//! Verifies JWT principal tokens for API requests. On success, inserts
//! the authenticated `user_id` into request extensions for downstream
//! handlers and the WebSocket upgrade handler.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// The authenticated principal, inserted into request extensions by
/// [`auth_middleware`] and read by handlers that need `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the authenticated user's id.
    pub sub: String,
    /// Expiry, unix seconds.
    pub exp: usize,
}

/// Authentication middleware
///
/// Extracts the Bearer token from the Authorization header and
/// validates it against `state.jwt_secret`. On success, inserts
/// [`Claims`] into request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth_header.starts_with("Bearer ") {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = &auth_header[7..];
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "JWT verification failed");
        StatusCode::UNAUTHORIZED
    })?
    .claims;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
