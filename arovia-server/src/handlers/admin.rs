//! Administrative endpoints. Every handler takes [`AdminAccount`], which
//! re-reads the caller's stored role on each request, so a demotion locks
//! the dashboard out on the very next call.

use crate::error::{ApiError, ApiResult};
use crate::extract::AdminAccount;
use crate::models::{
    AccountListResponse, AccountView, AnalyticsResponse, MessageResponse, RegistrationDay,
    StatusToggleResponse,
};
use crate::server::AroviaServer;
use axum::{
    extract::{Path, State},
    response::Json,
};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

fn parse_account_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::validation("Invalid user id"))
}

/// All accounts, most recently modified first.
pub async fn list_accounts(
    AdminAccount(_): AdminAccount,
    State(server): State<AroviaServer>,
) -> ApiResult<Json<AccountListResponse>> {
    let users: Vec<AccountView> = server
        .accounts
        .list_all()
        .await?
        .into_iter()
        .map(AccountView::from)
        .collect();

    Ok(Json(AccountListResponse {
        total: users.len(),
        users,
    }))
}

/// Dashboard aggregates: totals, role breakdown, trailing seven-day
/// registration trend, and the most recently modified account as a coarse
/// last-activity signal.
pub async fn analytics(
    AdminAccount(_): AdminAccount,
    State(server): State<AroviaServer>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let total_users = server.accounts.count().await?;

    let users_by_role: BTreeMap<String, i64> =
        server.accounts.count_by_role().await?.into_iter().collect();

    let registration_trend = server
        .accounts
        .registration_trend()
        .await?
        .into_iter()
        .map(|(date, count)| RegistrationDay { date, count })
        .collect();

    let last_logged_in_user = server
        .accounts
        .last_modified()
        .await?
        .map(AccountView::from);

    Ok(Json(AnalyticsResponse {
        total_users,
        users_by_role,
        registration_trend,
        last_logged_in_user,
    }))
}

/// Flip the active flag. Suspension takes effect on the target's next
/// authenticated request, not just at login.
pub async fn toggle_status(
    AdminAccount(admin): AdminAccount,
    State(server): State<AroviaServer>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusToggleResponse>> {
    let account_id = parse_account_id(&id)?;

    let account = server
        .accounts
        .toggle_active(account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    info!(
        admin_id = %admin.id,
        account_id = %account.id,
        is_active = account.is_active,
        "account status changed"
    );

    let message = if account.is_active {
        "User activated"
    } else {
        "User suspended"
    };

    Ok(Json(StatusToggleResponse {
        message: message.to_string(),
        user: AccountView::from(account),
    }))
}

/// Administrator-initiated deletion; same semantics as self-deletion.
pub async fn delete_account(
    AdminAccount(admin): AdminAccount,
    State(server): State<AroviaServer>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let account_id = parse_account_id(&id)?;

    let account = server
        .accounts
        .find_by_id(account_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    super::remove_account_files(&server, &account).await;
    server.accounts.delete(account.id).await?;

    info!(admin_id = %admin.id, account_id = %account.id, "account deleted by admin");
    Ok(Json(MessageResponse::new("User deleted")))
}
