use crate::server::AroviaServer;
use axum::{extract::State, response::Json};
use serde::Serialize;
use std::collections::HashMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HashMap<String, String>,
}

/// Liveness probe. Always answers 200; dependency state is reported in the
/// check map rather than the status code.
pub async fn health_check(State(server): State<AroviaServer>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();

    let database = if server.accounts.is_healthy().await {
        "healthy"
    } else {
        "unreachable"
    };
    checks.insert("database".to_string(), database.to_string());

    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    })
}
