//! Request extractors for authenticated routes.
//!
//! Every gated route goes through [`CurrentAccount`]: Bearer token, token
//! verification, then a fresh Account Store lookup. The lookup means role
//! and suspension changes take effect on the very next request instead of
//! whenever the token happens to expire.

use crate::error::{ApiError, ApiResult};
use crate::models::{Account, Role};
use crate::server::AroviaServer;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
};

/// JSON body extractor whose rejection speaks the platform's `{message}`
/// error body instead of axum's plain-text default.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}

/// The account making this request.
pub struct CurrentAccount(pub Account);

/// The account making this request, verified to hold the admin role.
pub struct AdminAccount(pub Account);

/// Pull the Bearer token out of the Authorization header.
fn bearer_token(parts: &Parts) -> ApiResult<String> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

    header
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))
}

/// The one role predicate every role-gated route goes through.
pub fn require_role(account: &Account, role: Role) -> ApiResult<()> {
    if account.role != role {
        return Err(ApiError::forbidden(match role {
            Role::Admin => "Access denied. Admin only.".to_string(),
            other => format!("Access denied. Requires {other} role."),
        }));
    }
    Ok(())
}

#[async_trait]
impl FromRequestParts<AroviaServer> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &AroviaServer,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let account_id = server.credentials.verify_token(&token)?;

        let account = server
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Token is not valid"))?;

        if !account.is_active {
            return Err(ApiError::unauthorized("Account is suspended"));
        }

        Ok(CurrentAccount(account))
    }
}

#[async_trait]
impl FromRequestParts<AroviaServer> for AdminAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &AroviaServer,
    ) -> Result<Self, Self::Rejection> {
        let CurrentAccount(account) = CurrentAccount::from_request_parts(parts, server).await?;
        require_role(&account, Role::Admin)?;
        Ok(AdminAccount(account))
    }
}
