//! Web API Directory/File Tests
//!
//! Integration tests for the directory and file endpoints.

mod common;

use axum::http::{header, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

use common::create_test_server;

/// Create a directory through the API and return its id.
async fn create_directory(server: &TestServer, name: &str, parent_id: Option<i64>) -> i64 {
    let response = server
        .post("/api/directory")
        .json(&json!({ "name": name, "parentId": parent_id }))
        .await;
    response.assert_status(StatusCode::CREATED);

    response.json::<Value>()["data"]["id"].as_i64().unwrap()
}

/// Upload one file through the API and return the response body.
async fn upload(
    server: &TestServer,
    name: &str,
    content: &'static [u8],
    directory_id: Option<i64>,
) -> Value {
    let mut form = MultipartForm::new().add_part(
        "files",
        Part::bytes(content).file_name(name).mime_type("text/plain"),
    );
    if let Some(id) = directory_id {
        form = form.add_text("directoryId", id.to_string());
    }

    let response = server.post("/api/upload").multipart(form).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_health() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({ "ok": true, "db": "connected" }));
}

#[tokio::test]
async fn test_create_directory() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let response = server
        .post("/api/directory")
        .json(&json!({ "name": "docs" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "docs");
    assert!(body["data"]["parentId"].is_null());
    assert!(body["data"]["createdAt"].is_string());
}

#[tokio::test]
async fn test_create_directory_empty_name() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let response = server
        .post("/api/directory")
        .json(&json!({ "name": "   " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_create_directory_missing_parent() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let response = server
        .post("/api/directory")
        .json(&json!({ "name": "orphan", "parentId": 999 }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_top_level_and_paths() {
    let (_temp_dir, server, _service) = create_test_server().await;
    let docs = create_directory(&server, "docs", None).await;
    let year = create_directory(&server, "2024", Some(docs)).await;

    let top: Value = server.get("/api/directories/top").await.json();
    let nodes = top["data"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["name"], "docs");
    assert_eq!(nodes[0]["expanded"], true);
    assert_eq!(nodes[0]["children"][0]["id"], year);
    assert_eq!(nodes[0]["children"][0]["expanded"], false);

    let paths: Value = server.get("/api/directories/paths").await.json();
    assert_eq!(
        paths["data"],
        json!([
            { "id": docs, "path": "docs" },
            { "id": year, "path": "docs/2024" },
        ])
    );
}

#[tokio::test]
async fn test_get_directory() {
    let (_temp_dir, server, _service) = create_test_server().await;
    let docs = create_directory(&server, "docs", None).await;
    upload(&server, "a.txt", b"abc", Some(docs)).await;

    let response = server.get(&format!("/api/directory/{docs}")).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["files"][0]["originalName"], "a.txt");

    server
        .get("/api/directory/9999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_download_delete() {
    let (_temp_dir, server, _service) = create_test_server().await;
    let docs = create_directory(&server, "docs", None).await;
    let year = create_directory(&server, "2024", Some(docs)).await;

    let body = upload(&server, "a.txt", b"abc", Some(year)).await;
    let file = &body["data"][0];
    let file_id = file["id"].as_i64().unwrap();
    assert_eq!(file["size"], 3);
    assert_eq!(file["directoryId"], year);
    assert_eq!(file["mimeType"], "text/plain");

    let list: Value = server.get("/api/files").await.json();
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let response = server.get(&format!("/api/files/{file_id}/download")).await;
    response.assert_status_ok();
    assert_eq!(&response.as_bytes()[..], b"abc");
    assert_eq!(
        response.header(header::CONTENT_DISPOSITION),
        "attachment; filename=\"a.txt\""
    );

    server
        .delete(&format!("/api/files/{file_id}"))
        .await
        .assert_status_ok();

    let list: Value = server.get("/api/files").await.json();
    assert!(list["data"].as_array().unwrap().is_empty());

    server
        .get(&format!("/api/files/{file_id}/download"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_multiple_files_to_root() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let form = MultipartForm::new()
        .add_part("files", Part::bytes(&b"one"[..]).file_name("one.txt"))
        .add_part("files", Part::bytes(&b"two"[..]).file_name("two.txt"));

    let response = server.post("/api/upload").multipart(form).await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f["directoryId"].is_null()));
}

#[tokio::test]
async fn test_upload_without_files() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let form = MultipartForm::new().add_text("directoryId", "1");
    let response = server.post("/api/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_too_many_files() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let mut form = MultipartForm::new();
    for i in 0..11 {
        form = form.add_part(
            "files",
            Part::bytes(&b"x"[..]).file_name(format!("{i}.txt")),
        );
    }

    let response = server.post("/api/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_duplicate_is_conflict() {
    let (_temp_dir, server, _service) = create_test_server().await;
    let docs = create_directory(&server, "docs", None).await;
    upload(&server, "a.txt", b"first", Some(docs)).await;

    let form = MultipartForm::new()
        .add_text("directoryId", docs.to_string())
        .add_part("files", Part::bytes(&b"second"[..]).file_name("a.txt"));
    let response = server.post("/api/upload").multipart(form).await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_upload_invalid_directory_id() {
    let (_temp_dir, server, _service) = create_test_server().await;

    let form = MultipartForm::new()
        .add_text("directoryId", "docs")
        .add_part("files", Part::bytes(&b"x"[..]).file_name("a.txt"));
    let response = server.post("/api/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_missing_blob_is_gone() {
    let (_temp_dir, server, service) = create_test_server().await;
    let body = upload(&server, "a.txt", b"abc", None).await;
    let file_id = body["data"][0]["id"].as_i64().unwrap();
    let storage_path = body["data"][0]["storagePath"].as_str().unwrap();

    std::fs::remove_file(service.storage().resolve(storage_path)).unwrap();

    let response = server.get(&format!("/api/files/{file_id}/download")).await;
    response.assert_status(StatusCode::GONE);
    assert_eq!(response.json::<Value>()["error"]["code"], "GONE");

    let state: Value = server
        .get(&format!("/api/files/{file_id}/state"))
        .await
        .json();
    assert_eq!(state["data"]["state"], "blob_missing");
}

#[tokio::test]
async fn test_get_file_metadata() {
    let (_temp_dir, server, _service) = create_test_server().await;
    let body = upload(&server, "notes.txt", b"hello", None).await;
    let file_id = body["data"][0]["id"].as_i64().unwrap();

    let response = server.get(&format!("/api/files/{file_id}")).await;

    response.assert_status_ok();
    let file: Value = response.json();
    assert_eq!(file["data"]["originalName"], "notes.txt");
    assert_eq!(file["data"]["size"], 5);
    assert_eq!(file["data"]["checksum"].as_str().unwrap().len(), 64);

    server
        .get("/api/files/424242")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_directory() {
    let (_temp_dir, server, _service) = create_test_server().await;
    let docs = create_directory(&server, "docs", None).await;
    create_directory(&server, "2024", Some(docs)).await;

    server
        .delete(&format!("/api/directory/{docs}"))
        .await
        .assert_status(StatusCode::CONFLICT);

    let empty = create_directory(&server, "empty", None).await;
    server
        .delete(&format!("/api/directory/{empty}"))
        .await
        .assert_status_ok();
    server
        .delete(&format!("/api/directory/{empty}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
