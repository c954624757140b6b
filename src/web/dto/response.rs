//! Response DTOs for the HTTP API.

use serde::Serialize;

use crate::file::FileState;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// One entry of the flattened directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEntry {
    /// Directory ID.
    pub id: i64,
    /// Names from the top level down, joined with `/`.
    pub path: String,
}

impl From<(i64, String)> for PathEntry {
    fn from((id, path): (i64, String)) -> Self {
        Self { id, path }
    }
}

/// Blob state of a file.
#[derive(Debug, Serialize)]
pub struct FileStateResponse {
    /// File ID.
    pub id: i64,
    /// Agreement between the record and its blob.
    pub state: FileState,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Whether the service can answer requests.
    pub ok: bool,
    /// Database status ("connected" or "down").
    pub db: &'static str,
}
