//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;

use treevault::config::TreeConfig;
use treevault::web::{create_router, AppState};
use treevault::{BlobStore, Database, HierarchyService};

/// Create a service over an in-memory database and a temporary blob root.
///
/// The TempDir must be kept alive for the duration of the test.
pub async fn setup_service() -> (TempDir, HierarchyService) {
    setup_service_with(TreeConfig::default()).await
}

/// Like [`setup_service`] with explicit tree limits.
pub async fn setup_service_with(tree: TreeConfig) -> (TempDir, HierarchyService) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let storage = BlobStore::new(temp_dir.path().join("blobs")).expect("Failed to create storage");

    (temp_dir, HierarchyService::new(db, storage, tree))
}

/// Create an axum-test server over a fresh service.
pub async fn create_test_server() -> (TempDir, TestServer, HierarchyService) {
    let (temp_dir, service) = setup_service().await;
    let router = create_router(Arc::new(AppState::new(service.clone())));
    let server = TestServer::new(router).expect("Failed to create test server");

    (temp_dir, server, service)
}

/// Download a file and return its bytes.
pub async fn read_file(service: &HierarchyService, id: i64) -> Vec<u8> {
    service
        .download_file(id)
        .await
        .expect("download failed")
        .into_bytes()
        .await
        .expect("read failed")
}
