//! File records and repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{Result, VaultError};

const SELECT_COLUMNS: &str = "SELECT id, original_name, storage_path, mime_type, size, checksum,
        directory_id, uploaded_at FROM files";

/// SQLite bind parameters per `IN (...)` query.
const MAX_BIND_PARAMS: usize = 500;

/// Metadata for one stored blob and its place in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Unique file ID.
    pub id: i64,
    /// Name as supplied by the uploader.
    pub original_name: String,
    /// Blob path relative to the storage root.
    pub storage_path: String,
    /// MIME type captured at upload.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Hex SHA-256 of the stored bytes.
    pub checksum: String,
    /// Directory ID (None for root-level files).
    pub directory_id: Option<i64>,
    /// When the file was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Name as supplied by the uploader.
    pub original_name: String,
    /// Blob path relative to the storage root.
    pub storage_path: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Hex SHA-256 of the stored bytes.
    pub checksum: String,
    /// Directory ID (None for root-level files).
    pub directory_id: Option<i64>,
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    ///
    /// A storage path already owned by another record is a `Conflict`; a
    /// directory that no longer exists is `NotFound`.
    pub async fn create(&self, file: &NewFile) -> Result<File> {
        let created = sqlx::query_as::<_, File>(
            "INSERT INTO files (original_name, storage_path, mime_type, size, checksum, directory_id, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id, original_name, storage_path, mime_type, size, checksum, directory_id, uploaded_at",
        )
        .bind(&file.original_name)
        .bind(&file.storage_path)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(&file.checksum)
        .bind(file.directory_id)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => VaultError::NotFound(format!(
                "directory {}",
                file.directory_id.unwrap_or_default()
            )),
            _ => VaultError::from_insert(e, &format!("storage path {}", file.storage_path)),
        })?;

        Ok(created)
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(file)
    }

    /// List all files, newest first.
    pub async fn list_all(&self) -> Result<Vec<File>> {
        let files = sqlx::query_as::<_, File>(&format!(
            "{SELECT_COLUMNS} ORDER BY uploaded_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// List files in any of `directory_ids`, newest first.
    pub async fn list_by_directories(&self, directory_ids: &[i64]) -> Result<Vec<File>> {
        let mut files = Vec::new();

        for chunk in directory_ids.chunks(MAX_BIND_PARAMS) {
            let mut query: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("{SELECT_COLUMNS} WHERE directory_id IN ("));
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows = query.build_query_as::<File>().fetch_all(self.pool).await?;
            files.extend(rows);
        }

        files.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(files)
    }

    /// Count files in a directory.
    pub async fn count_by_directory(&self, directory_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE directory_id = ?")
            .bind(directory_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Delete a file record.
    ///
    /// Returns `false` if no such record existed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
