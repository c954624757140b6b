//! Request DTOs for the HTTP API.

use serde::Deserialize;

/// Directory creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectoryRequest {
    /// Directory name. A missing name is treated as empty.
    #[serde(default)]
    pub name: String,
    /// Parent directory ID (omit for a top-level directory).
    #[serde(default)]
    pub parent_id: Option<i64>,
}
