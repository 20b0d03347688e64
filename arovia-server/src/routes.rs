use crate::{
    handlers::{admin, auth, health, user},
    server::AroviaServer,
};
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

/// Create authentication routes
pub fn auth_routes() -> Router<AroviaServer> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/google", get(auth::google_redirect))
        .route("/google/callback", get(auth::google_callback))
}

/// Create account self-service routes (all bearer-gated)
pub fn user_routes() -> Router<AroviaServer> {
    Router::new()
        .route("/profile", get(user::get_profile))
        .route("/profile", put(user::update_profile))
        .route("/address", put(user::update_address))
        .route("/change-password", post(user::change_password))
        .route("/prescription", post(user::upload_prescription))
        .route("/prescription/:id", delete(user::delete_prescription))
        .route("/delete-account", delete(user::delete_account))
}

/// Create admin routes (bearer-gated + role-gated)
pub fn admin_routes() -> Router<AroviaServer> {
    Router::new()
        .route("/users", get(admin::list_accounts))
        .route("/analytics", get(admin::analytics))
        .route("/users/:id/status", patch(admin::toggle_status))
        .route("/users/:id", delete(admin::delete_account))
}

/// Create all application routes
pub fn create_routes() -> Router<AroviaServer> {
    Router::new()
        // Liveness probe (no authentication required)
        .route("/api/health", get(health::health_check))
        .nest("/api/auth", auth_routes())
        .nest("/api/user", user_routes())
        .nest("/api/admin", admin_routes())
}
