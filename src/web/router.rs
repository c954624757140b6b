//! Router configuration for the HTTP API.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::file::MAX_FILES_PER_UPLOAD;

use super::dto::HealthResponse;
use super::handlers::{
    create_directory, delete_directory, delete_file, download_file, get_directory, get_file,
    get_file_state, list_directory_paths, list_files, list_top_level, upload_files, AppState,
};

/// Multipart framing allowance on top of the file bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let per_file = usize::try_from(app_state.service.max_file_size()).unwrap_or(usize::MAX);
    let body_limit = per_file
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD);

    let directory_routes = Router::new()
        .route("/directory", post(create_directory))
        .route(
            "/directory/:id",
            get(get_directory).delete(delete_directory),
        )
        .route("/directories/top", get(list_top_level))
        .route("/directories/paths", get(list_directory_paths));

    let file_routes = Router::new()
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/files", get(list_files))
        .route("/files/:id", get(get_file).delete(delete_file))
        .route("/files/:id/download", get(download_file))
        .route("/files/:id/state", get(get_file_state));

    let api_routes = Router::new().merge(directory_routes).merge(file_routes);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state)
}

/// Health check handler.
async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    match state.db().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                db: "connected",
            }),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    ok: false,
                    db: "down",
                }),
            )
        }
    }
}
