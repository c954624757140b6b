//! API handlers for the HTTP API.

pub mod directory;
pub mod file;

pub use directory::*;
pub use file::*;

use crate::db::Database;
use crate::file::HierarchyService;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Hierarchy service over the metadata and blob stores.
    pub service: HierarchyService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: HierarchyService) -> Self {
        Self { service }
    }

    /// Get the database handle.
    pub fn db(&self) -> &Database {
        self.service.database()
    }
}
