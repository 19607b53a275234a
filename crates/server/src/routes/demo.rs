use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorResponse};
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct StartDemoResponse {
    status: String,
}

/// Start a demo run. Progress is streamed to WebSocket observers.
#[utoipa::path(
    post,
    path = "/api/demo/start",
    responses(
        (status = 202, description = "Demo run started", body = StartDemoResponse),
        (status = 409, description = "A demo run is already active", body = ErrorResponse)
    ),
    tag = "demo"
)]
pub async fn start_demo(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StartDemoResponse>), AppError> {
    state.orchestrator.start()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StartDemoResponse {
            status: "started".to_string(),
        }),
    ))
}
