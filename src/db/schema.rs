//! Database schema and migrations for treevault.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: directory tree
    r#"
CREATE TABLE directories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL CHECK (name <> ''),
    parent_id   INTEGER REFERENCES directories(id) ON DELETE RESTRICT,
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_directories_parent_id ON directories(parent_id);
"#,
    // v2: file records
    r#"
CREATE TABLE files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    original_name   TEXT NOT NULL,
    storage_path    TEXT NOT NULL UNIQUE,      -- relative to the blob root
    mime_type       TEXT NOT NULL,
    size            INTEGER NOT NULL,
    checksum        TEXT NOT NULL,             -- hex SHA-256 of the stored bytes
    directory_id    INTEGER REFERENCES directories(id) ON DELETE RESTRICT,
    uploaded_at     TEXT NOT NULL
);

CREATE INDEX idx_files_directory_id ON files(directory_id);
CREATE INDEX idx_files_uploaded_at ON files(uploaded_at);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_directories_migration() {
        let sql = MIGRATIONS[0];
        assert!(sql.contains("CREATE TABLE directories"));
        assert!(sql.contains("parent_id"));
        assert!(sql.contains("ON DELETE RESTRICT"));
    }

    #[test]
    fn test_files_migration() {
        let sql = MIGRATIONS[1];
        assert!(sql.contains("CREATE TABLE files"));
        assert!(sql.contains("storage_path    TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("uploaded_at"));
    }
}
