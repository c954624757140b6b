//! Error types for treevault.

use thiserror::Error;

/// Common error type for treevault.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Missing or invalid input (empty directory name, unusable file name, ...).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Referenced directory or file does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Storage path collision or a directory that cannot be removed yet.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Metadata record exists but its blob is absent.
    #[error("{0} removed from storage")]
    Gone(String),

    /// Tree shape violates the forest invariant (cycle or dangling parent).
    #[error("inconsistent tree: {0}")]
    Inconsistent(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

// Conversion from sqlx errors
impl From<sqlx::Error> for VaultError {
    fn from(e: sqlx::Error) -> Self {
        VaultError::Database(e.to_string())
    }
}

impl VaultError {
    /// Map a sqlx error, turning UNIQUE violations into `Conflict`.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                VaultError::Conflict(format!("{what} already exists"))
            }
            _ => VaultError::Database(e.to_string()),
        }
    }
}

/// Result type alias for treevault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
