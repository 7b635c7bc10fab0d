//! Admin bearer-token authentication

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use shared::error::AppError;

use crate::state::AppState;

/// Middleware that checks the `Authorization: Bearer <token>` header
/// against `ADMIN_API_TOKEN`
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let Some(expected) = state.admin_token.as_deref() else {
        // Development without a token
        return Ok(next.run(request).await);
    };

    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format").into_response())?;

    if !tokens_match(token, expected) {
        tracing::debug!("Admin token rejected");
        return Err(AppError::invalid_token("Invalid admin token").into_response());
    }

    Ok(next.run(request).await)
}

/// Constant-time comparison over SHA-256 digests
fn tokens_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
