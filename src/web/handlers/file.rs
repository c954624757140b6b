//! File handlers for the HTTP API.

use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{File, MAX_FILES_PER_UPLOAD};
use crate::web::dto::{ApiResponse, FileStateResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Multipart part name carrying file contents.
const FILES_FIELD: &str = "files";

/// Multipart part name carrying the target directory.
const DIRECTORY_FIELD: &str = "directoryId";

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are removed, and quotes and backslashes are replaced
/// in the plain `filename`. Non-ASCII names are also sent as an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let encoded = urlencoding::encode(filename);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Upload exceeds the size limit");
    }
    tracing::debug!("Rejected multipart body: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// Parse the optional `directoryId` part. Blank means root level.
fn parse_directory_id(value: &str) -> Result<Option<i64>, ApiError> {
    let value = value.trim();
    if value.is_empty() || value == "null" {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ApiError::bad_request("directoryId must be an integer"))
}

/// One uploaded part, fully buffered.
struct UploadPart {
    filename: String,
    content_type: Option<String>,
    content: Bytes,
}

/// POST /api/upload - Upload up to ten files into a directory.
///
/// Files are placed in the order received. Placement stops at the first
/// failure; files placed before it are kept.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<File>>>), ApiError> {
    let mut directory_id: Option<i64> = None;
    let mut parts: Vec<UploadPart> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            FILES_FIELD => {
                if parts.len() == MAX_FILES_PER_UPLOAD {
                    return Err(ApiError::bad_request(format!(
                        "At most {MAX_FILES_PER_UPLOAD} files per upload"
                    )));
                }
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let content = field.bytes().await.map_err(multipart_error)?;
                parts.push(UploadPart {
                    filename,
                    content_type,
                    content,
                });
            }
            DIRECTORY_FIELD => {
                let value = field.text().await.map_err(multipart_error)?;
                directory_id = parse_directory_id(&value)?;
            }
            _ => {}
        }
    }

    if parts.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let mut placed = Vec::with_capacity(parts.len());
    for part in parts {
        let file = state
            .service
            .place_file(
                &part.content[..],
                &part.filename,
                directory_id,
                part.content_type.as_deref(),
            )
            .await?;
        placed.push(file);
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::new(placed))))
}

/// GET /api/files - List all files, newest first.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<File>>>, ApiError> {
    let files = state.service.list_files().await?;
    Ok(Json(ApiResponse::new(files)))
}

/// GET /api/files/:id - Get file metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<File>>, ApiError> {
    let file = state.service.get_file(file_id).await?;
    Ok(Json(ApiResponse::new(file)))
}

/// GET /api/files/:id/state - Compare a file record with its blob.
pub async fn get_file_state(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileStateResponse>>, ApiError> {
    let file_state = state.service.file_state(file_id).await?;
    Ok(Json(ApiResponse::new(FileStateResponse {
        id: file_id,
        state: file_state,
    })))
}

/// GET /api/files/:id/download - Download file contents.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let download = state.service.download_file(file_id).await?;
    let file = download.file.clone();
    let content = download.into_bytes().await?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, &file.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.original_name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.service.delete_file(file_id).await?;
    Ok(Json(ApiResponse::new(())))
}
