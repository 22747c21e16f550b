use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use choguuket_core::StoreError;
use serde_json::json;

use crate::bridge::NotifyError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    NotFoundError(String),
    DeliveryError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::DeliveryError(msg) => {
                tracing::warn!("Notification not delivered: {}", msg);
                (StatusCode::BAD_GATEWAY, "Notification could not be delivered".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::NotFound(id) => AppError::NotFoundError(format!("Trip request {} not found", id)),
            NotifyError::Store(e) => AppError::InternalServerError(e.to_string()),
            NotifyError::Delivery(e) => AppError::DeliveryError(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}
