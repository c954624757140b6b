//! treevault - directory tree and file storage service
//!
//! Directory and file metadata live in SQLite; file bytes live in a blob
//! root on the local filesystem, laid out by directory id. The
//! [`HierarchyService`] keeps the two in step and answers tree queries.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{Result, VaultError};
pub use file::{
    BlobStore, Directory, DirectoryNode, Download, File, FileState, HierarchyService,
};
pub use web::WebServer;
