use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::extract::AppJson;
use crate::handlers::forms::{self, FilePart};
use crate::models::{
    AccountSummary, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role,
};
use crate::repository::NewAccount;
use crate::server::AroviaServer;
use crate::storage;
use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    response::{Json, Redirect},
};
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

/// Register a new local account.
///
/// Accepts a JSON body or a multipart form carrying an optional
/// `profileImage` avatar. The email pre-check gives the friendly conflict
/// message; the unique index remains the authority when two registrations
/// race.
pub async fn register(
    State(server): State<AroviaServer>,
    request: Request,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let (payload, avatar): (RegisterRequest, Option<FilePart>) =
        forms::read_json_or_multipart(request, "profileImage").await?;
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    if server.accounts.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let profile_picture = match avatar {
        Some(file) => Some(store_avatar(&server, &file).await?),
        None => None,
    };

    let password_hash = server.credentials.hash(&payload.password)?;

    let account = server
        .accounts
        .insert(NewAccount {
            name: payload.name.trim().to_string(),
            email,
            password_hash: Some(password_hash),
            google_id: None,
            role: payload.role.unwrap_or(Role::User),
            profile_picture,
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("User already exists")
            } else {
                ApiError::from(e)
            }
        })?;

    info!(account_id = %account.id, "account registered");
    let token = server.credentials.issue_token(account.id)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            token,
            user: AccountSummary::from(&account),
        }),
    ))
}

/// Email/password sign-in.
///
/// Every failure path collapses into the same `Invalid credentials` so the
/// response never reveals whether the email exists.
pub async fn login(
    State(server): State<AroviaServer>,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    payload.validate()?;

    let account = server
        .accounts
        .find_by_email(payload.email.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // OAuth-only accounts have no digest to verify against: fail closed.
    let digest = account
        .password_hash
        .as_deref()
        .ok_or(ApiError::InvalidCredentials)?;

    if !server.credentials.verify(&payload.password, digest)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = server.credentials.issue_token(account.id)?;

    Ok(Json(LoginResponse {
        token,
        role: account.role,
        user: AccountSummary::from(&account),
    }))
}

#[derive(Debug, Deserialize)]
pub struct GoogleCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// First OAuth state: hand the browser to the identity provider.
pub async fn google_redirect(State(server): State<AroviaServer>) -> Redirect {
    match &server.oauth {
        Some(oauth) => Redirect::to(&oauth.authorization_url().await),
        None => {
            warn!("Google sign-in requested but OAuth is not configured");
            Redirect::to(&login_error_url(&server.config.client_url))
        }
    }
}

/// Second OAuth state: the provider called back with an assertion.
///
/// Whatever goes wrong, the browser lands on the client's login view with an
/// error indicator, never on a raw error page.
pub async fn google_callback(
    State(server): State<AroviaServer>,
    Query(query): Query<GoogleCallbackQuery>,
) -> Redirect {
    match complete_google_sign_in(&server, query).await {
        Ok(url) => Redirect::to(&url),
        Err(e) => {
            warn!(error = %e, "Google sign-in failed");
            Redirect::to(&login_error_url(&server.config.client_url))
        }
    }
}

async fn complete_google_sign_in(
    server: &AroviaServer,
    query: GoogleCallbackQuery,
) -> ApiResult<String> {
    let oauth = server
        .oauth
        .as_ref()
        .ok_or_else(|| ApiError::internal("Google OAuth is not configured"))?;

    if let Some(error) = query.error {
        return Err(ApiError::unauthorized(format!(
            "identity provider returned: {error}"
        )));
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::validation("missing authorization code"))?;
    let state = query
        .state
        .ok_or_else(|| ApiError::validation("missing state parameter"))?;

    let assertion = oauth
        .exchange(&code, &state)
        .await
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    let existing = server
        .accounts
        .find_by_google_id_or_email(&assertion.subject, &assertion.email)
        .await?;

    let account = match existing {
        // Local account seen for the first time through the provider: link
        // it, backfilling the avatar only if none is set.
        Some(account) if account.google_id.is_none() => server
            .accounts
            .link_google(account.id, &assertion.subject, assertion.picture.as_deref())
            .await?
            .ok_or_else(|| ApiError::internal("account disappeared while linking"))?,
        Some(account) => account,
        None => {
            let created = server
                .accounts
                .insert(NewAccount {
                    name: assertion
                        .name
                        .clone()
                        .unwrap_or_else(|| assertion.email.clone()),
                    email: assertion.email.trim().to_lowercase(),
                    password_hash: None,
                    google_id: Some(assertion.subject.clone()),
                    role: Role::User,
                    profile_picture: assertion.picture.clone(),
                })
                .await?;
            info!(account_id = %created.id, "account created from identity assertion");
            created
        }
    };

    let token = server.credentials.issue_token(account.id)?;

    Ok(format!(
        "{}/login?token={}&role={}&name={}",
        server.config.client_url,
        token,
        account.role,
        urlencoding::encode(&account.name)
    ))
}

fn login_error_url(client_url: &str) -> String {
    format!("{client_url}/login?error=auth_failed")
}

/// Validate and store an uploaded avatar, returning its public URL.
pub(crate) async fn store_avatar(server: &AroviaServer, file: &FilePart) -> ApiResult<String> {
    storage::validate_upload(
        &file.original_name,
        file.content_type.as_deref(),
        file.bytes.len(),
        storage::IMAGE_TYPES,
    )?;
    let saved = server
        .storage
        .save(storage::PROFILE_IMAGES_DIR, &file.original_name, &file.bytes)
        .await?;
    Ok(server
        .storage
        .public_url(storage::PROFILE_IMAGES_DIR, &saved.stored_name))
}
