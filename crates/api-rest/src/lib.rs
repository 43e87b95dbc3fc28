//! # API REST
//!
//! REST API for the VFS upload service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Request classification (raw `PUT` bodies, multipart `POST` forms)
//! - JSON responses and status codes for upload outcomes
//! - OpenAPI/Swagger documentation and CORS
//!
//! Storage and orchestration live in `vfs_files`; this crate only adapts HTTP to
//! [`UploadService`].

#![warn(rust_2018_idioms)]

mod handlers;
mod health;
mod request;
mod response;

pub use health::{HealthRes, HealthService};
pub use request::UploadParams;
pub use response::{status_for, UploadResponse};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use vfs_files::UploadService;

/// Application state for the REST API server
///
/// Cloned into every handler; the upload service carries the shared config,
/// repository and name generator.
#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadService,
}

impl AppState {
    pub fn new(uploads: UploadService) -> Self {
        Self { uploads }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::put_hash_upload,
        handlers::post_hash_upload,
        handlers::put_file_upload,
        handlers::post_file_upload,
    ),
    components(schemas(HealthRes, UploadResponse))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
///
/// Axum's default body limit is turned off; upload size is enforced by the
/// upload service against the configured maximum.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/upload/hash",
            put(handlers::put_hash_upload).post(handlers::post_hash_upload),
        )
        .route(
            "/upload/file",
            put(handlers::put_file_upload).post(handlers::post_file_upload),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
