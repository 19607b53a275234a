pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "KEMTLS Demo API",
        version = "0.1.0",
        description = "Live post-quantum OIDC + KEMTLS demonstration. Run progress is streamed over the `/ws` WebSocket."
    ),
    paths(routes::health_check, routes::start_demo),
    components(schemas(
        routes::HealthResponse,
        routes::StartDemoResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "demo", description = "Demo run control"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(state: AppState) -> Router {
    let app_dir = state.app_dir.clone();

    let api_router = Router::new()
        .route("/health", get(routes::health_check))
        .route("/ws", get(routes::websocket_handler))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/demo/start", post(routes::start_demo))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    if let Some(app_dir) = app_dir {
        let index_file = app_dir.join("index.html");
        let serve_dir = ServeDir::new(&app_dir).not_found_service(ServeFile::new(&index_file));
        api_router.fallback_service(serve_dir)
    } else {
        api_router
    }
}
