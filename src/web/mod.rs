//! HTTP API for treevault.
//!
//! A thin axum layer over [`HierarchyService`](crate::file::HierarchyService):
//! it decodes JSON and multipart requests, calls the service, and maps
//! errors to status codes.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
