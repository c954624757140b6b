//! Configuration module for treevault.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, VaultError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/treevault.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for file blobs.
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Maximum size of a single uploaded file in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_storage_root() -> String {
    "uploads".to_string()
}

fn default_max_upload_bytes() -> u64 {
    crate::file::DEFAULT_MAX_FILE_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Directory tree limits.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct TreeConfig {
    /// How many levels below a listed directory are populated.
    #[serde(default = "default_listing_depth")]
    pub listing_depth: usize,
    /// Maximum number of directory levels (top-level directories are level 1).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_listing_depth() -> usize {
    1
}

fn default_max_depth() -> usize {
    crate::file::MAX_DIRECTORY_DEPTH
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            listing_depth: default_listing_depth(),
            max_depth: default_max_depth(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/treevault.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Directory tree limits.
    #[serde(default)]
    pub tree: TreeConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VaultError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: HTTP listen port
    /// - `UPLOAD_DIR`: blob storage root
    /// - `DATABASE_PATH`: SQLite database file
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Empty values and unparsable ports are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = lookup("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.storage.root = dir;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = path;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.tree.listing_depth == 0 {
            return Err(VaultError::Config(
                "tree.listing_depth must be at least 1".to_string(),
            ));
        }
        if self.tree.max_depth == 0 {
            return Err(VaultError::Config(
                "tree.max_depth must be at least 1".to_string(),
            ));
        }
        if self.storage.max_upload_bytes == 0 {
            return Err(VaultError::Config(
                "storage.max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
