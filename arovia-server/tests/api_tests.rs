//! End-to-end API tests driven through the router.
//!
//! These need a PostgreSQL instance: set `DATABASE_URL` to a scratch
//! database and run `cargo test -- --ignored`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use arovia_server::{create_app, AroviaServer, ServerConfig};

struct TestApp {
    app: Router,
    upload_dir: std::path::PathBuf,
}

impl TestApp {
    async fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must point at a scratch database for API tests");

        let pool = PgPool::connect(&database_url)
            .await
            .expect("failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");

        let upload_dir = std::env::temp_dir().join(format!("arovia-test-{}", Uuid::new_v4()));
        let config = ServerConfig {
            database_url,
            token_secret: "test-secret".to_string(),
            client_url: "http://localhost:5173".to_string(),
            upload_dir: upload_dir.clone(),
            google: None,
        };

        let server = AroviaServer::new_with_pool(config, pool)
            .await
            .expect("failed to create test server");

        Self {
            app: create_app(server),
            upload_dir,
        }
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn upload(
        &self,
        token: &str,
        field: &str,
        filename: &str,
        content_type: &str,
        payload: &[u8],
    ) -> (StatusCode, Value) {
        let boundary = "test-boundary-7MA4YWxkTrZu0gW";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; \
                 name=\"{field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/user/prescription")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register a fresh account, returning `(token, email)`.
    async fn register(&self, role: Option<&str>) -> (String, String) {
        let email = format!("{}@example.com", Uuid::new_v4());
        let mut body = json!({
            "name": "Test Person",
            "email": email,
            "password": "strong-enough-password",
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }

        let (status, response) = self
            .request("POST", "/api/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = response["token"].as_str().unwrap().to_string();
        (token, email)
    }

    async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.upload_dir).await;
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn health_check_needs_no_auth() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn register_then_login_round_trip() {
    let app = TestApp::new().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let (status, registered) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Asha Rao",
                "email": email,
                "password": "strong-enough-password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["user"]["role"], "user");
    assert!(registered["user"].get("passwordHash").is_none());

    let (status, logged_in) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "strong-enough-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged_in["user"]["id"], registered["user"]["id"]);

    // Both tokens resolve to the same account.
    let token = logged_in["token"].as_str().unwrap();
    let (status, profile) = app
        .request("GET", "/api/user/profile", Some(token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], email.to_lowercase());
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn duplicate_email_registration_conflicts() {
    let app = TestApp::new().await;
    let email = format!("{}@example.com", Uuid::new_v4());
    let body = json!({
        "name": "First",
        "email": email,
        "password": "strong-enough-password",
    });

    let (status, _) = app
        .request("POST", "/api/auth/register", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = app
        .request("POST", "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["message"], "User already exists");

    // Case-insensitive uniqueness.
    let (status, _) = app
        .request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Second",
                "email": email.to_uppercase(),
                "password": "strong-enough-password",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn login_failures_are_undifferentiated() {
    let app = TestApp::new().await;
    let (_, email) = app.register(None).await;

    let (wrong_pw_status, wrong_pw) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "wrong-password!" })),
        )
        .await;
    let (no_user_status, no_user) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "nouser@example.com", "password": "anything-at-all" })),
        )
        .await;

    assert_eq!(wrong_pw_status, StatusCode::BAD_REQUEST);
    assert_eq!(no_user_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_pw, no_user);
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn partial_profile_update_leaves_other_fields_alone() {
    let app = TestApp::new().await;
    let (token, email) = app.register(None).await;

    let (status, updated) = app
        .request(
            "PUT",
            "/api/user/profile",
            Some(&token),
            Some(json!({ "phone": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "123");
    assert_eq!(updated["name"], "Test Person");
    assert_eq!(updated["email"], email.to_lowercase());
    assert!(updated.get("address").is_none());
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn address_is_replaced_wholesale() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    let (status, _) = app
        .request(
            "PUT",
            "/api/user/address",
            Some(&token),
            Some(json!({
                "country": "India",
                "city": "Pune",
                "pincode": "411001",
                "landmark": "Near the clock tower"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, updated) = app
        .request(
            "PUT",
            "/api/user/address",
            Some(&token),
            Some(json!({ "country": "India", "city": "Mumbai" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["address"]["city"], "Mumbai");
    // The old sub-fields are gone, not merged.
    assert!(updated["address"]["pincode"].is_null());
    assert!(updated["address"]["landmark"].is_null());
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn change_password_requires_the_current_one() {
    let app = TestApp::new().await;
    let (token, email) = app.register(None).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/user/change-password",
            Some(&token),
            Some(json!({
                "currentPassword": "not-the-password",
                "newPassword": "another-long-password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "POST",
            "/api/user/change-password",
            Some(&token),
            Some(json!({
                "currentPassword": "strong-enough-password",
                "newPassword": "another-long-password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": "another-long-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn prescription_upload_rules() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    // Disallowed type.
    let (status, _) = app
        .upload(&token, "prescription", "tool.exe", "application/octet-stream", b"MZ")
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // Allowed type but oversized.
    let six_mb = vec![0u8; 6 * 1024 * 1024];
    let (status, _) = app
        .upload(&token, "prescription", "scan.pdf", "application/pdf", &six_mb)
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    // Allowed and sized: appends exactly one record.
    let one_mb = vec![0u8; 1024 * 1024];
    let (status, account) = app
        .upload(&token, "prescription", "scan.png", "image/png", &one_mb)
        .await;
    assert_eq!(status, StatusCode::OK);
    let prescriptions = account["prescriptions"].as_array().unwrap();
    assert_eq!(prescriptions.len(), 1);
    assert_eq!(prescriptions[0]["originalName"], "scan.png");
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn deleting_a_missing_prescription_is_a_noop() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    let bogus = Uuid::new_v4();
    let (status, account) = app
        .request(
            "DELETE",
            &format!("/api/user/prescription/{bogus}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["prescriptions"].as_array().unwrap().len(), 0);
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn non_admin_tokens_are_forbidden_on_admin_routes() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    for (method, uri) in [
        ("GET", "/api/admin/users".to_string()),
        ("GET", "/api/admin/analytics".to_string()),
        ("PATCH", format!("/api/admin/users/{}/status", Uuid::new_v4())),
        ("DELETE", format!("/api/admin/users/{}", Uuid::new_v4())),
    ] {
        let (status, _) = app.request(method, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
    }
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn suspension_locks_out_the_next_request() {
    let app = TestApp::new().await;
    let (admin_token, _) = app.register(Some("admin")).await;
    let (user_token, _) = app.register(None).await;

    let (status, profile) = app
        .request("GET", "/api/user/profile", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = profile["id"].as_str().unwrap().to_string();

    let (status, toggled) = app
        .request(
            "PATCH",
            &format!("/api/admin/users/{user_id}/status"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["user"]["isActive"], false);

    // The still-valid token no longer authenticates.
    let (status, _) = app
        .request("GET", "/api/user/profile", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn deleted_account_orphans_its_token() {
    let app = TestApp::new().await;
    let (token, _) = app.register(None).await;

    let (status, _) = app
        .request("DELETE", "/api/user/delete-account", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request("GET", "/api/user/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL; set DATABASE_URL and run with --ignored"]
async fn admin_list_is_ordered_by_recent_modification() {
    let app = TestApp::new().await;
    let (admin_token, admin_email) = app.register(Some("admin")).await;
    let (user_token, user_email) = app.register(None).await;

    // Touch the first account so it becomes the most recently modified.
    let (status, _) = app
        .request(
            "PUT",
            "/api/user/profile",
            Some(&user_token),
            Some(json!({ "phone": "555" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, listing) = app
        .request("GET", "/api/admin/users", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let users = listing["users"].as_array().unwrap();
    assert!(users.len() >= 2);
    let emails: Vec<&str> = users.iter().filter_map(|u| u["email"].as_str()).collect();
    let user_pos = emails.iter().position(|e| *e == user_email.to_lowercase());
    let admin_pos = emails.iter().position(|e| *e == admin_email.to_lowercase());
    assert!(user_pos.unwrap() < admin_pos.unwrap());

    let (status, analytics) = app
        .request("GET", "/api/admin/analytics", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(analytics["totalUsers"].as_i64().unwrap() >= 2);
    assert!(analytics["usersByRole"]["user"].as_i64().unwrap() >= 1);
    // Sibling tests may be registering concurrently, so only the shape of
    // the last-activity signal is stable here.
    assert!(analytics["lastLoggedInUser"]["email"].is_string());
    assert!(analytics["lastLoggedInUser"].get("passwordHash").is_none());
    app.cleanup().await;
}
