//! Local collaborator emulator using redb.
//!
//! Stands in for the hosted auth, document and blob services so the client
//! can run without a cloud project. Everything lives in one database file:
//! - Accounts (salted SHA-256 password digests)
//! - Identity-token links for external sign-in
//! - The cached session, which survives restarts like a real auth SDK's
//! - Documents as JSON keyed by `collection/id`
//! - Blobs, content-addressed by BLAKE3

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use rand::RngCore;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::{
    document_key, is_direct_child, merge_into, AuthProvider, BlobStore, Document, DocumentStore,
};
use crate::error::{AppError, AppResult};
use crate::types::{Session, UserId};

// Table definitions
const ACCOUNTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");
const CREDENTIALS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("credentials");
const SESSION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("session");
const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");
const BLOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");
const BLOB_PATHS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("blob_paths");

const SESSION_KEY: &str = "current";

/// Minimum password length accepted by account creation.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountEntry {
    user_id: String,
    salt: [u8; 16],
    digest: [u8; 32],
}

fn password_digest(salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn invalid_credentials() -> AppError {
    AppError::Auth(Some(
        "The password is invalid or the user does not exist.".into(),
    ))
}

/// redb-backed implementation of all three collaborators.
#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<RwLock<Database>>,
}

impl LocalBackend {
    /// Open (or create) the emulator database at `path`.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS_TABLE)?;
            let _ = write_txn.open_table(CREDENTIALS_TABLE)?;
            let _ = write_txn.open_table(SESSION_TABLE)?;
            let _ = write_txn.open_table(DOCUMENTS_TABLE)?;
            let _ = write_txn.open_table(BLOBS_TABLE)?;
            let _ = write_txn.open_table(BLOB_PATHS_TABLE)?;
        }
        write_txn.commit()?;

        info!(?path, "Opened local backend");
        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    fn save_session(&self, session: Option<&Session>) -> AppResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_TABLE)?;
            match session {
                Some(session) => {
                    let data = postcard::to_allocvec(session)
                        .map_err(|e| AppError::Serialization(e.to_string()))?;
                    table.insert(SESSION_KEY, data.as_slice())?;
                }
                None => {
                    table.remove(SESSION_KEY)?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn load_session(&self) -> AppResult<Option<Session>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SESSION_TABLE)?;
        match table.get(SESSION_KEY)? {
            Some(v) => {
                let session: Session = postcard::from_bytes(v.value())
                    .map_err(|e| AppError::Serialization(e.to_string()))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn load_account(&self, email: &str) -> AppResult<Option<AccountEntry>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS_TABLE)?;
        match table.get(email)? {
            Some(v) => {
                let entry: AccountEntry = postcard::from_bytes(v.value())
                    .map_err(|e| AppError::Serialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn read_document(&self, key: &str) -> AppResult<Option<Document>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS_TABLE)?;
        match table.get(key)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn write_document(&self, key: &str, doc: &Document) -> AppResult<()> {
        let data = serde_json::to_vec(doc)?;
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS_TABLE)?;
            table.insert(key, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch blob bytes by the hash embedded in a `local://blobs/<hash>` URL.
    pub fn load_blob(&self, url: &str) -> AppResult<Option<Vec<u8>>> {
        let hash = url.strip_prefix("local://blobs/").unwrap_or(url);
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(BLOBS_TABLE)?;
        Ok(table.get(hash)?.map(|v| v.value().to_vec()))
    }
}

#[async_trait]
impl AuthProvider for LocalBackend {
    fn current_session(&self) -> Option<Session> {
        match self.load_session() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Cached session unreadable, treating as signed out");
                None
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        let entry = self.load_account(email)?.ok_or_else(invalid_credentials)?;
        if password_digest(&entry.salt, password) != entry.digest {
            debug!(email, "Password mismatch");
            return Err(invalid_credentials());
        }

        let session = Session::new(entry.user_id).with_email(email);
        self.save_session(Some(&session))?;
        info!(user_id = %session.user_id, "Signed in with password");
        Ok(session)
    }

    async fn sign_in_with_credential(&self, id_token: &str) -> AppResult<Session> {
        if id_token.trim().is_empty() {
            return Err(AppError::Auth(Some("Invalid identity token.".into())));
        }
        let subject = blake3::hash(id_token.as_bytes()).to_hex().to_string();

        let db = self.db.read();
        let write_txn = db.begin_write()?;
        let user_id = {
            let mut table = write_txn.open_table(CREDENTIALS_TABLE)?;
            let existing = table.get(subject.as_str())?.map(|v| v.value().to_string());
            match existing {
                Some(user_id) => user_id,
                None => {
                    let user_id = Ulid::new().to_string();
                    table.insert(subject.as_str(), user_id.as_str())?;
                    user_id
                }
            }
        };
        write_txn.commit()?;
        drop(db);

        let session = Session::new(user_id);
        self.save_session(Some(&session))?;
        info!(user_id = %session.user_id, "Signed in with identity token");
        Ok(session)
    }

    async fn create_account(&self, email: &str, password: &str) -> AppResult<Session> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Auth(Some(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            ))));
        }

        let mut salt = [0u8; 16];
        rand::rng().fill_bytes(&mut salt);
        let entry = AccountEntry {
            user_id: Ulid::new().to_string(),
            salt,
            digest: password_digest(&salt, password),
        };
        let data =
            postcard::to_allocvec(&entry).map_err(|e| AppError::Serialization(e.to_string()))?;

        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(ACCOUNTS_TABLE)?;
            if table.get(email)?.is_some() {
                return Err(AppError::Auth(Some(
                    "The email address is already in use by another account.".into(),
                )));
            }
            table.insert(email, data.as_slice())?;
        }
        write_txn.commit()?;
        drop(db);

        let session = Session::new(entry.user_id).with_email(email);
        self.save_session(Some(&session))?;
        info!(user_id = %session.user_id, "Created account");
        Ok(session)
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.save_session(None)?;
        info!("Signed out");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalBackend {
    async fn get_document(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        self.read_document(&document_key(collection, id))
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> AppResult<()> {
        let key = document_key(collection, id);
        let doc = match (merge, self.read_document(&key)?) {
            (true, Some(mut existing)) => {
                merge_into(&mut existing, doc);
                existing
            }
            _ => doc,
        };
        self.write_document(&key, &doc)
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> AppResult<()> {
        let key = document_key(collection, id);
        let mut doc = self
            .read_document(&key)?
            .ok_or_else(|| AppError::NotFound(key.clone()))?;
        doc.insert(field.to_string(), value);
        self.write_document(&key, &doc)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> AppResult<()> {
        let key = document_key(collection, id);
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS_TABLE)?;
            table.remove(key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> AppResult<Vec<(String, Document)>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS_TABLE)?;

        let mut docs = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if let Some(id) = is_direct_child(key.value(), collection) {
                let doc: Document = serde_json::from_slice(value.value())?;
                docs.push((id, doc));
            }
        }
        Ok(docs)
    }

    async fn add_document(&self, collection: &str, doc: Document) -> AppResult<String> {
        let id = Ulid::new().to_string();
        self.write_document(&document_key(collection, &id), &doc)?;
        Ok(id)
    }
}

#[async_trait]
impl BlobStore for LocalBackend {
    async fn put_file(&self, path: &str, bytes: Bytes) -> AppResult<String> {
        let hash = hex::encode(blake3::hash(&bytes).as_bytes());

        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut blobs = write_txn.open_table(BLOBS_TABLE)?;
            let mut paths = write_txn.open_table(BLOB_PATHS_TABLE)?;
            blobs.insert(hash.as_str(), bytes.as_ref())?;
            paths.insert(path, hash.as_str())?;
        }
        write_txn.commit()?;

        debug!(path, %hash, size = bytes.len(), "Stored blob");
        Ok(format!("local://blobs/{}", hash))
    }
}
