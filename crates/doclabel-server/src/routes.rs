//! Router for the image file server.

use std::path::Path;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Health check for the launcher and container orchestration.
async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Serve `images_dir` at the root with permissive CORS, so the annotation
/// tool (on another port) can load page images.
pub fn create_router(images_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback_service(ServeDir::new(images_dir))
        .layer(CorsLayer::permissive())
}
