//! Directory handlers for the HTTP API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::file::{Directory, DirectoryNode};
use crate::web::dto::{ApiResponse, CreateDirectoryRequest, PathEntry};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/directory - Create a directory.
pub async fn create_directory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDirectoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Directory>>), ApiError> {
    let directory = state
        .service
        .create_directory(&req.name, req.parent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(directory))))
}

/// GET /api/directories/top - List top-level directories with their contents.
pub async fn list_top_level(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<DirectoryNode>>>, ApiError> {
    let nodes = state.service.get_top_level().await?;
    Ok(Json(ApiResponse::new(nodes)))
}

/// GET /api/directories/paths - List every directory with its full name path.
pub async fn list_directory_paths(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PathEntry>>>, ApiError> {
    let paths = state
        .service
        .flatten_to_paths()
        .await?
        .into_iter()
        .map(PathEntry::from)
        .collect();

    Ok(Json(ApiResponse::new(paths)))
}

/// GET /api/directory/:id - Get one directory with its contents.
pub async fn get_directory(
    State(state): State<Arc<AppState>>,
    Path(directory_id): Path<i64>,
) -> Result<Json<ApiResponse<DirectoryNode>>, ApiError> {
    let node = state.service.get_subtree(directory_id).await?;
    Ok(Json(ApiResponse::new(node)))
}

/// DELETE /api/directory/:id - Delete an empty directory.
pub async fn delete_directory(
    State(state): State<Arc<AppState>>,
    Path(directory_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.service.delete_directory(directory_id).await?;
    Ok(Json(ApiResponse::new(())))
}
