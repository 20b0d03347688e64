pub mod admin;
pub mod auth;
pub mod forms;
pub mod health;
pub mod user;

use crate::models::Account;
use crate::server::AroviaServer;
use std::path::Path;

/// Best-effort cleanup of every locally stored file an account references.
/// Runs before the row is deleted; a failed removal is logged, never fatal.
/// An orphaned file is preferable to a half-deleted account.
pub(crate) async fn remove_account_files(server: &AroviaServer, account: &Account) {
    for prescription in account.prescriptions.0.iter() {
        server.storage.remove(Path::new(&prescription.path)).await;
    }

    if let Some(picture) = &account.profile_picture {
        // Provider-hosted avatars map to None and are left alone.
        if let Some(path) = server.storage.local_path_for_url(picture) {
            server.storage.remove(&path).await;
        }
    }
}
