use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::state::AppState;

/// Requires `Authorization: Bearer <token>` when a token is configured; open otherwise.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.auth_token.as_ref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    if token != expected.expose().as_str() {
        return Err(AppError::AuthenticationError("Invalid bearer token".to_string()));
    }

    Ok(next.run(req).await)
}
