//! Local-disk storage for uploaded files.
//!
//! Files land under the configured upload root (`uploads/` by default) in a
//! per-purpose subdirectory and are served back at `/uploads/...`. Writes are
//! not atomic with the corresponding account update; removal is best-effort.

use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Subdirectory for prescription documents.
pub const PRESCRIPTIONS_DIR: &str = "prescriptions";
/// Subdirectory for profile images.
pub const PROFILE_IMAGES_DIR: &str = "profile-images";

/// Upload size ceiling: 5 MB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Media types accepted for prescription documents.
pub const PRESCRIPTION_TYPES: &[&str] = &["jpeg", "jpg", "png", "pdf"];
/// Media types accepted for profile images.
pub const IMAGE_TYPES: &[&str] = &["jpeg", "jpg", "png"];

/// Check an upload against the allowed set and the size ceiling.
///
/// Both the filename extension and the declared media type must match; a
/// correct extension with a mismatched content type is rejected, and vice
/// versa.
pub fn validate_upload(
    original_name: &str,
    content_type: Option<&str>,
    size: usize,
    allowed: &[&str],
) -> ApiResult<()> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let extension_ok = allowed.contains(&extension.as_str());
    let media_type_ok = content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            allowed.iter().any(|t| ct.contains(t))
        })
        .unwrap_or(false);

    if !extension_ok || !media_type_ok {
        return Err(ApiError::unsupported_media_type(format!(
            "Only {} files are allowed",
            allowed.join(", ")
        )));
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::payload_too_large(
            "File is too large (maximum 5 MB)",
        ));
    }

    Ok(())
}

/// Strip anything outside `[A-Za-z0-9._-]` so an original filename cannot
/// escape the upload directory or confuse the filesystem.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // A name of only stripped characters still needs to be usable.
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Stored name: upload time in milliseconds plus the sanitized original.
fn stored_filename(original_name: &str) -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_filename(original_name)
    )
}

/// A file that has been written to disk.
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub stored_name: String,
    /// Filesystem path, relative to the server working directory when the
    /// upload root is relative.
    pub path: PathBuf,
}

/// Local-disk upload store rooted at the configured upload directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload subdirectories if they do not exist yet.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [PRESCRIPTIONS_DIR, PROFILE_IMAGES_DIR] {
            tokio::fs::create_dir_all(self.root.join(dir)).await?;
        }
        Ok(())
    }

    /// Write `bytes` under the given subdirectory with a collision-resistant
    /// name derived from the original.
    pub async fn save(
        &self,
        subdir: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> ApiResult<SavedFile> {
        let stored_name = stored_filename(original_name);
        let path = self.root.join(subdir).join(&stored_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;
        debug!(path = %path.display(), "upload stored");

        Ok(SavedFile { stored_name, path })
    }

    /// URL under which a stored file is served back to the client.
    pub fn public_url(&self, subdir: &str, stored_name: &str) -> String {
        format!("/uploads/{subdir}/{stored_name}")
    }

    /// Map a `/uploads/...` URL back to the file it refers to, if it is one
    /// of ours. Provider-hosted avatar URLs return `None`.
    pub fn local_path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix("/uploads/")?;
        // Reject anything that could climb out of the upload root.
        if rest.split('/').any(|part| part == "..") {
            return None;
        }
        Some(self.root.join(rest))
    }

    /// Best-effort removal; a missing file is logged, never an error.
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "could not remove stored file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn exe_is_rejected() {
        let err = validate_upload(
            "malware.exe",
            Some("application/octet-stream"),
            1024,
            PRESCRIPTION_TYPES,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn oversized_pdf_is_rejected() {
        let err = validate_upload(
            "scan.pdf",
            Some("application/pdf"),
            6 * 1024 * 1024,
            PRESCRIPTION_TYPES,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { .. }));
    }

    #[test]
    fn small_png_is_accepted() {
        assert!(validate_upload(
            "scan.png",
            Some("image/png"),
            1024 * 1024,
            PRESCRIPTION_TYPES
        )
        .is_ok());
    }

    #[test]
    fn extension_and_media_type_must_both_match() {
        // Right extension, wrong declared type.
        assert!(validate_upload(
            "scan.png",
            Some("application/octet-stream"),
            10,
            PRESCRIPTION_TYPES
        )
        .is_err());
        // Right declared type, wrong extension.
        assert!(validate_upload("scan.bin", Some("image/png"), 10, PRESCRIPTION_TYPES).is_err());
        // Missing declared type.
        assert!(validate_upload("scan.png", None, 10, PRESCRIPTION_TYPES).is_err());
    }

    #[test]
    fn pdf_is_not_a_valid_profile_image() {
        assert!(validate_upload("me.pdf", Some("application/pdf"), 10, IMAGE_TYPES).is_err());
        assert!(validate_upload("me.jpg", Some("image/jpeg"), 10, IMAGE_TYPES).is_ok());
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("my scan (1).pdf"), "my_scan__1_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("..."), "file");
    }

    #[test]
    fn stored_name_keeps_the_original_suffix() {
        let name = stored_filename("scan.pdf");
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest, "scan.pdf");
    }

    #[test]
    fn url_mapping_round_trip() {
        let storage = LocalStorage::new("uploads");
        let url = storage.public_url(PROFILE_IMAGES_DIR, "123-me.png");
        assert_eq!(url, "/uploads/profile-images/123-me.png");
        assert_eq!(
            storage.local_path_for_url(&url).unwrap(),
            PathBuf::from("uploads/profile-images/123-me.png")
        );
        assert!(storage.local_path_for_url("https://cdn.example.com/a.png").is_none());
        assert!(storage.local_path_for_url("/uploads/../secrets").is_none());
    }

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let root = std::env::temp_dir().join(format!("arovia-storage-{}", Uuid::new_v4()));
        let storage = LocalStorage::new(&root);
        storage.ensure_dirs().await.unwrap();

        let saved = storage
            .save(PRESCRIPTIONS_DIR, "scan.png", b"png-bytes")
            .await
            .unwrap();
        assert!(saved.path.exists());
        assert_eq!(tokio::fs::read(&saved.path).await.unwrap(), b"png-bytes");

        storage.remove(&saved.path).await;
        assert!(!saved.path.exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
