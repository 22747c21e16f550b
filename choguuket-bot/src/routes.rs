use axum::{
    extract::{Query, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use choguuket_core::{ChatId, RequestId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bridge::NotifyOutcome;
use crate::error::AppError;
use crate::middleware::bearer_auth_middleware;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    pub request_id: RequestId,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub delivered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsQuery {
    pub chat_id: ChatId,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/notify", post(notify_user))
        .route("/exists", get(check_user_exists))
        .route_layer(middleware::from_fn_with_state(state, bearer_auth_middleware));

    Router::new().route("/health", get(health)).merge(protected)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /notify
/// Pushes a "new trips" message for a stored trip request into its chat.
/// `delivered` is false when the request currently has no matching trips.
async fn notify_user(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, AppError> {
    info!("Notification requested for trip request {}", req.request_id);
    let outcome = state.bridge.notify_user(req.request_id, req.message.as_deref()).await?;
    Ok(Json(NotifyResponse {
        delivered: matches!(outcome, NotifyOutcome::Delivered { .. }),
    }))
}

/// GET /exists?chatId=
async fn check_user_exists(
    State(state): State<AppState>,
    Query(query): Query<ExistsQuery>,
) -> Result<Json<ExistsResponse>, AppError> {
    let exists = state.bridge.check_user_exists(query.chat_id).await?;
    Ok(Json(ExistsResponse { exists }))
}
