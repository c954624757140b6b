//! Directory records and repository.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{Result, VaultError};

/// SQLite bind parameters per `IN (...)` query.
const MAX_BIND_PARAMS: usize = 500;

/// A directory in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    /// Unique directory ID.
    pub id: i64,
    /// Directory name (unique only among siblings, and not enforced).
    pub name: String,
    /// Parent directory ID (None for top-level directories).
    pub parent_id: Option<i64>,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new directory.
#[derive(Debug, Clone)]
pub struct NewDirectory {
    /// Directory name.
    pub name: String,
    /// Parent directory ID (None for top-level directories).
    pub parent_id: Option<i64>,
}

impl NewDirectory {
    /// Create a new top-level NewDirectory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
        }
    }

    /// Set the parent directory.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Repository for directory records.
pub struct DirectoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DirectoryRepository<'a> {
    /// Create a new DirectoryRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new directory.
    ///
    /// A parent that does not exist (or vanished concurrently) is `NotFound`.
    pub async fn create(&self, directory: &NewDirectory) -> Result<Directory> {
        let created = sqlx::query_as::<_, Directory>(
            "INSERT INTO directories (name, parent_id, created_at) VALUES (?, ?, ?)
             RETURNING id, name, parent_id, created_at",
        )
        .bind(&directory.name)
        .bind(directory.parent_id)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_foreign_key_violation() => VaultError::NotFound(format!(
                "directory {}",
                directory.parent_id.unwrap_or_default()
            )),
            _ => VaultError::Database(e.to_string()),
        })?;

        Ok(created)
    }

    /// Get a directory by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Directory>> {
        let directory = sqlx::query_as::<_, Directory>(
            "SELECT id, name, parent_id, created_at FROM directories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(directory)
    }

    /// List top-level directories in creation order.
    pub async fn list_root(&self) -> Result<Vec<Directory>> {
        let directories = sqlx::query_as::<_, Directory>(
            "SELECT id, name, parent_id, created_at
             FROM directories WHERE parent_id IS NULL ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(directories)
    }

    /// List the children of any of `parent_ids`, ordered by ID.
    pub async fn list_by_parents(&self, parent_ids: &[i64]) -> Result<Vec<Directory>> {
        let mut directories = Vec::new();

        for chunk in parent_ids.chunks(MAX_BIND_PARAMS) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT id, name, parent_id, created_at FROM directories WHERE parent_id IN (",
            );
            let mut separated = query.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows = query
                .build_query_as::<Directory>()
                .fetch_all(self.pool)
                .await?;
            directories.extend(rows);
        }

        directories.sort_by_key(|d| d.id);
        Ok(directories)
    }

    /// List every directory ordered by ID.
    pub async fn list_all(&self) -> Result<Vec<Directory>> {
        let directories = sqlx::query_as::<_, Directory>(
            "SELECT id, name, parent_id, created_at FROM directories ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(directories)
    }

    /// Count child directories.
    pub async fn count_children(&self, id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM directories WHERE parent_id = ?")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Delete a directory record.
    ///
    /// Returns `false` if no such record existed. A record that still has
    /// children or files is a `Conflict`.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM directories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_foreign_key_violation() => {
                    VaultError::Conflict(format!("directory {id} is not empty"))
                }
                _ => VaultError::Database(e.to_string()),
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Get the ancestor chain from the top level down to `id`, inclusive.
    ///
    /// `NotFound` if `id` does not exist. A parent reference that dangles
    /// or loops back is reported as `Inconsistent`.
    pub async fn get_path(&self, id: i64) -> Result<Vec<Directory>> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current_id = Some(id);

        while let Some(directory_id) = current_id {
            if !visited.insert(directory_id) {
                return Err(VaultError::Inconsistent(format!(
                    "directory {directory_id} is its own ancestor"
                )));
            }

            let directory = match self.get_by_id(directory_id).await? {
                Some(directory) => directory,
                None if directory_id == id => {
                    return Err(VaultError::NotFound(format!("directory {id}")));
                }
                None => {
                    return Err(VaultError::Inconsistent(format!(
                        "ancestor {directory_id} of directory {id} is missing"
                    )));
                }
            };

            current_id = directory.parent_id;
            path.push(directory);
        }

        path.reverse();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_directory() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let directory = repo.create(&NewDirectory::new("共有ファイル")).await.unwrap();

        assert_eq!(directory.name, "共有ファイル");
        assert!(directory.parent_id.is_none());
    }

    #[tokio::test]
    async fn test_create_with_missing_parent() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let result = repo.create(&NewDirectory::new("child").with_parent(42)).await;

        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_directory_not_found() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_root_in_creation_order() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        repo.create(&NewDirectory::new("B")).await.unwrap();
        let a = repo.create(&NewDirectory::new("A")).await.unwrap();
        repo.create(&NewDirectory::new("child").with_parent(a.id))
            .await
            .unwrap();

        let roots = repo.list_root().await.unwrap();
        let names: Vec<_> = roots.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_list_by_parents() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let p1 = repo.create(&NewDirectory::new("p1")).await.unwrap();
        let p2 = repo.create(&NewDirectory::new("p2")).await.unwrap();
        let c1 = repo.create(&NewDirectory::new("c1").with_parent(p2.id)).await.unwrap();
        let c2 = repo.create(&NewDirectory::new("c2").with_parent(p1.id)).await.unwrap();

        let children = repo.list_by_parents(&[p1.id, p2.id]).await.unwrap();
        let ids: Vec<_> = children.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![c1.id, c2.id]);

        assert_eq!(repo.list_by_parents(&[p1.id]).await.unwrap(), vec![c2]);
        assert!(repo.list_by_parents(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_directory() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let directory = repo.create(&NewDirectory::new("ToDelete")).await.unwrap();

        assert!(repo.delete(directory.id).await.unwrap());
        assert!(repo.get_by_id(directory.id).await.unwrap().is_none());
        assert!(!repo.delete(directory.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_with_child_is_conflict() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let parent = repo.create(&NewDirectory::new("parent")).await.unwrap();
        repo.create(&NewDirectory::new("child").with_parent(parent.id))
            .await
            .unwrap();

        assert_eq!(repo.count_children(parent.id).await.unwrap(), 1);
        assert!(matches!(
            repo.delete(parent.id).await,
            Err(VaultError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_get_path() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let root = repo.create(&NewDirectory::new("Root")).await.unwrap();
        let level1 = repo
            .create(&NewDirectory::new("Level1").with_parent(root.id))
            .await
            .unwrap();
        let level2 = repo
            .create(&NewDirectory::new("Level2").with_parent(level1.id))
            .await
            .unwrap();

        let path = repo.get_path(level2.id).await.unwrap();
        let names: Vec<_> = path.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Level1", "Level2"]);

        assert!(matches!(
            repo.get_path(9999).await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_path_detects_cycle() {
        let db = setup_db().await;
        let repo = DirectoryRepository::new(db.pool());

        let a = repo.create(&NewDirectory::new("a")).await.unwrap();
        let b = repo.create(&NewDirectory::new("b").with_parent(a.id)).await.unwrap();

        // No API can do this; simulate a corrupted store.
        sqlx::query("UPDATE directories SET parent_id = ? WHERE id = ?")
            .bind(b.id)
            .bind(a.id)
            .execute(db.pool())
            .await
            .unwrap();

        assert!(matches!(
            repo.get_path(b.id).await,
            Err(VaultError::Inconsistent(_))
        ));
    }
}
