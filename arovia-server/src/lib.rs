//! Arovia Server - patient platform HTTP API
//!
//! This library provides the core functionality of the Arovia HTTP server:
//! account registration and authentication (local and Google OAuth), profile
//! and address management, prescription uploads, and the admin dashboard
//! endpoints.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use server::AroviaServer;

use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

// Multipart ceiling: comfortably above the 5 MB per-file limit so oversized
// uploads reach the handler and get a proper 413 body instead of a generic
// transport error.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the main application router with all routes and middleware
pub fn create_app(server: AroviaServer) -> Router {
    let uploads = ServeDir::new(&server.config.upload_dir);

    routes::create_routes()
        .nest_service("/uploads", uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(&server.config))
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(server)
}
