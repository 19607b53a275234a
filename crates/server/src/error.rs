use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use orchestrator::StartError;

#[derive(Debug)]
pub enum AppError {
    Conflict(String),
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AppError::Conflict(msg) => {
                tracing::debug!(message = %msg, "Request conflicts with current state");
                (StatusCode::CONFLICT, "conflict", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<StartError> for AppError {
    fn from(err: StartError) -> Self {
        match err {
            StartError::AlreadyRunning => AppError::Conflict(err.to_string()),
        }
    }
}
