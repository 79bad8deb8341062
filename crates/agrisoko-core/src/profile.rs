//! Profile picture upload.
//!
//! The picture goes to blob storage at `users/{uid}/profilePicture`; the
//! returned download URL is then written to the `profilePicture` field.

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{BlobStore, Document, DocumentStore};
use crate::error::{AppError, AppResult};
use crate::roles::into_write_failure;
use crate::types::{UserId, USERS_COLLECTION};

/// Upload `bytes` as the user's profile picture and return its URL.
///
/// Rejects empty files and files over `max_bytes` before contacting any
/// collaborator.
pub async fn upload_profile_picture(
    blobs: &dyn BlobStore,
    store: &dyn DocumentStore,
    user_id: &UserId,
    bytes: Bytes,
    max_bytes: usize,
) -> AppResult<String> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Picture is empty.".into()));
    }
    if bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "Picture too large: {} bytes (max {} bytes)",
            bytes.len(),
            max_bytes
        )));
    }

    let size = bytes.len();
    let url = blobs
        .put_file(&user_id.profile_picture_path(), bytes)
        .await
        .map_err(into_write_failure)?;
    debug!(%user_id, size, %url, "Uploaded profile picture");

    let mut doc = Document::new();
    doc.insert("profilePicture".to_string(), Value::from(url.clone()));
    store
        .set_document(USERS_COLLECTION, user_id.as_str(), doc, true)
        .await
        .map_err(into_write_failure)?;

    info!(%user_id, "Profile picture updated");
    Ok(url)
}
