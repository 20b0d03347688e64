use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, CurrentAccount};
use crate::handlers::{auth::store_avatar, forms, remove_account_files};
use crate::models::{
    AccountView, Address, ChangePasswordRequest, MessageResponse, Prescription,
    UpdateProfileRequest,
};
use crate::server::AroviaServer;
use crate::storage;
use axum::{
    extract::{Multipart, Path, Request, State},
    response::Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Full account view for the owner.
pub async fn get_profile(CurrentAccount(account): CurrentAccount) -> Json<AccountView> {
    Json(AccountView::from(account))
}

/// Partial profile update; only supplied fields change, email never does.
///
/// Accepts JSON or a multipart form with an optional `profileImage` part.
pub async fn update_profile(
    State(server): State<AroviaServer>,
    CurrentAccount(account): CurrentAccount,
    request: Request,
) -> ApiResult<Json<AccountView>> {
    let (mut payload, avatar): (UpdateProfileRequest, _) =
        forms::read_json_or_multipart(request, "profileImage").await?;
    payload.validate()?;

    if let Some(file) = avatar {
        payload.profile_picture = Some(store_avatar(&server, &file).await?);
    }

    let updated = server
        .accounts
        .update_profile(account.id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(AccountView::from(updated)))
}

/// Replace the address sub-record wholesale.
pub async fn update_address(
    State(server): State<AroviaServer>,
    CurrentAccount(account): CurrentAccount,
    AppJson(address): AppJson<Address>,
) -> ApiResult<Json<AccountView>> {
    let updated = server
        .accounts
        .update_address(account.id, &address)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(AccountView::from(updated)))
}

/// Rotate the local password after verifying the current one.
pub async fn change_password(
    State(server): State<AroviaServer>,
    CurrentAccount(account): CurrentAccount,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.validate()?;

    let digest = account
        .password_hash
        .as_deref()
        .ok_or(ApiError::InvalidCredentials)?;

    if !server.credentials.verify(&payload.current_password, digest)? {
        return Err(ApiError::InvalidCredentials);
    }

    let new_digest = server.credentials.hash(&payload.new_password)?;
    server
        .accounts
        .update_password(account.id, &new_digest)
        .await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// Attach a prescription document.
pub async fn upload_prescription(
    State(server): State<AroviaServer>,
    CurrentAccount(account): CurrentAccount,
    multipart: Multipart,
) -> ApiResult<Json<AccountView>> {
    let (_, file) = forms::collect_form(multipart, "prescription").await?;
    let file = file.ok_or_else(|| ApiError::validation("prescription file is required"))?;

    storage::validate_upload(
        &file.original_name,
        file.content_type.as_deref(),
        file.bytes.len(),
        storage::PRESCRIPTION_TYPES,
    )?;

    let saved = server
        .storage
        .save(storage::PRESCRIPTIONS_DIR, &file.original_name, &file.bytes)
        .await?;

    let record = Prescription {
        id: Uuid::new_v4(),
        filename: saved.stored_name.clone(),
        original_name: file.original_name.clone(),
        path: saved.path.to_string_lossy().into_owned(),
        uploaded_at: Utc::now(),
    };

    let updated = server
        .accounts
        .append_prescription(account.id, &record)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    info!(account_id = %account.id, filename = %record.filename, "prescription uploaded");
    Ok(Json(AccountView::from(updated)))
}

/// Detach a prescription document. Removing an id that does not exist is a
/// no-op, not an error.
pub async fn delete_prescription(
    State(server): State<AroviaServer>,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountView>> {
    let prescription_id =
        Uuid::parse_str(&id).map_err(|_| ApiError::validation("Invalid prescription id"))?;

    if let Some(record) = account
        .prescriptions
        .0
        .iter()
        .find(|p| p.id == prescription_id)
    {
        server
            .storage
            .remove(std::path::Path::new(&record.path))
            .await;
    }

    let updated = server
        .accounts
        .remove_prescription(account.id, prescription_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(AccountView::from(updated)))
}

/// Self-deletion: discard stored files, then the record. Irreversible.
pub async fn delete_account(
    State(server): State<AroviaServer>,
    CurrentAccount(account): CurrentAccount,
) -> ApiResult<Json<MessageResponse>> {
    remove_account_files(&server, &account).await;
    server.accounts.delete(account.id).await?;

    info!(account_id = %account.id, "account deleted by owner");
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}
