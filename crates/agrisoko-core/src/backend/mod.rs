//! Collaborator interfaces: auth, document store and blob storage.
//!
//! The client owns none of this state. Everything goes through the three
//! traits below so the app controller can run against the hosted platform,
//! the local emulator ([`LocalBackend`]) or the test double ([`MemoryBackend`]).
//!
//! ```text
//! users/{userId}                     email, role, name, phoneNumber,
//!                                    profilePicture, totalSales, totalEarnings
//! users/{userId}/products/{id}       name, price, quantity
//! users/{userId}/orders/{id}         customerName, status
//! blob: users/{userId}/profilePicture
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::AppResult;
use crate::types::Session;

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::{Fault, MemoryBackend, Op};

/// A document is a flat JSON object of named fields.
pub type Document = serde_json::Map<String, Value>;

/// Authentication collaborator.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Last known session, served from the provider's local cache.
    fn current_session(&self) -> Option<Session>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session>;

    /// Sign in with an identity token issued by an external provider (Google).
    async fn sign_in_with_credential(&self, id_token: &str) -> AppResult<Session>;

    async fn create_account(&self, email: &str, password: &str) -> AppResult<Session>;

    async fn sign_out(&self) -> AppResult<()>;
}

/// Remote document database collaborator.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// Write a document. With `merge` the given fields are merged into any
    /// existing document instead of replacing it.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> AppResult<()>;

    /// Update one field of an existing document. Fails with `NotFound` when
    /// the document does not exist.
    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> AppResult<()>;

    async fn delete_document(&self, collection: &str, id: &str) -> AppResult<()>;

    /// Direct children of `collection`, ordered by id.
    async fn list_documents(&self, collection: &str) -> AppResult<Vec<(String, Document)>>;

    /// Insert a document under a generated id and return the id.
    async fn add_document(&self, collection: &str, doc: Document) -> AppResult<String>;
}

/// Blob storage collaborator.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, returning a download URL.
    async fn put_file(&self, path: &str, bytes: Bytes) -> AppResult<String>;
}

/// Merge `update` into `existing`, field by field.
pub(crate) fn merge_into(existing: &mut Document, update: Document) {
    for (field, value) in update {
        existing.insert(field, value);
    }
}

/// Storage key for a document: `collection/id`.
pub(crate) fn document_key(collection: &str, id: &str) -> String {
    format!("{}/{}", collection.trim_end_matches('/'), id)
}

/// Whether `key` names a direct child of `collection`.
pub(crate) fn is_direct_child(key: &str, collection: &str) -> Option<String> {
    let prefix = format!("{}/", collection.trim_end_matches('/'));
    let rest = key.strip_prefix(&prefix)?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest.to_string())
    }
}
