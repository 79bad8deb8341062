//! In-memory collaborator double with fault injection.
//!
//! Implements all three collaborator traits over plain maps. Tests use it to
//! script remote state (`put_user`), to make a given operation fail
//! (`inject`), to slow reads down (`set_read_delay`) and to count how often a
//! document was read (`reads_of`).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use ulid::Ulid;

use super::{
    document_key, is_direct_child, merge_into, AuthProvider, BlobStore, Document, DocumentStore,
};
use crate::error::{AppError, AppResult};
use crate::types::{Session, UserId, UserRecord, USERS_COLLECTION};

/// Collaborator operation that a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    SignIn,
    SignInWithCredential,
    CreateAccount,
    SignOut,
    GetDocument,
    SetDocument,
    UpdateField,
    DeleteDocument,
    ListDocuments,
    PutFile,
}

/// Failure returned by an operation with an injected fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    PermissionDenied,
    Network,
    Auth(Option<String>),
    Write(String),
}

impl Fault {
    fn to_error(&self, op: Op) -> AppError {
        match self {
            Fault::PermissionDenied => {
                AppError::PermissionDenied(format!("{:?}: missing or insufficient permissions", op))
            }
            Fault::Network => AppError::Network(format!("{:?}: unavailable", op)),
            Fault::Auth(msg) => AppError::Auth(msg.clone()),
            Fault::Write(msg) => AppError::Write(msg.clone()),
        }
    }
}

#[derive(Default)]
struct State {
    /// email -> (password, user id)
    accounts: HashMap<String, (String, UserId)>,
    /// id token -> user id
    credentials: HashMap<String, UserId>,
    session: Option<Session>,
    documents: BTreeMap<String, Document>,
    blobs: HashMap<String, Bytes>,
    faults: HashMap<Op, Fault>,
    reads: HashMap<String, usize>,
    read_delay: Option<Duration>,
}

/// In-memory auth, document store and blob storage.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    total_reads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `session` already cached, as after a previous app run.
    pub fn with_session(session: Session) -> Self {
        let backend = Self::new();
        backend.state.lock().session = Some(session);
        backend
    }

    pub fn set_session(&self, session: Option<Session>) {
        self.state.lock().session = session;
    }

    /// Register an email/password account without touching the session.
    pub fn add_account(&self, email: &str, password: &str, user_id: impl Into<String>) {
        self.state.lock().accounts.insert(
            email.to_string(),
            (password.to_string(), UserId::new(user_id)),
        );
    }

    /// Map an external identity token to a user id.
    pub fn add_credential(&self, id_token: &str, user_id: impl Into<String>) {
        self.state
            .lock()
            .credentials
            .insert(id_token.to_string(), UserId::new(user_id));
    }

    /// Write `users/{user_id}` directly.
    pub fn put_user(&self, user_id: &str, record: &UserRecord) {
        let doc = record.to_document().unwrap_or_default();
        self.put_document(USERS_COLLECTION, user_id, doc);
    }

    pub fn put_document(&self, collection: &str, id: &str, doc: Document) {
        self.state
            .lock()
            .documents
            .insert(document_key(collection, id), doc);
    }

    /// Read a document without counting it as a client read.
    pub fn peek_document(&self, collection: &str, id: &str) -> Option<Document> {
        self.state
            .lock()
            .documents
            .get(&document_key(collection, id))
            .cloned()
    }

    pub fn blob(&self, path: &str) -> Option<Bytes> {
        self.state.lock().blobs.get(path).cloned()
    }

    /// Make every call of `op` fail with `fault` until cleared.
    pub fn inject(&self, op: Op, fault: Fault) {
        self.state.lock().faults.insert(op, fault);
    }

    pub fn clear_fault(&self, op: Op) {
        self.state.lock().faults.remove(&op);
    }

    /// Delay applied to every `get_document` call.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.state.lock().read_delay = delay;
    }

    /// Number of `get_document` calls that targeted `collection/id`.
    pub fn reads_of(&self, collection: &str, id: &str) -> usize {
        self.state
            .lock()
            .reads
            .get(&document_key(collection, id))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.total_reads.load(Ordering::SeqCst)
    }

    fn check(&self, op: Op) -> AppResult<()> {
        match self.state.lock().faults.get(&op) {
            Some(fault) => Err(fault.to_error(op)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    fn current_session(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        self.check(Op::SignIn)?;
        let mut state = self.state.lock();
        let user_id = match state.accounts.get(email) {
            Some((stored, user_id)) if stored == password => user_id.clone(),
            _ => {
                return Err(AppError::Auth(Some(
                    "The password is invalid or the user does not exist.".into(),
                )))
            }
        };
        let session = Session {
            user_id,
            email: Some(email.to_string()),
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_in_with_credential(&self, id_token: &str) -> AppResult<Session> {
        self.check(Op::SignInWithCredential)?;
        if id_token.is_empty() {
            return Err(AppError::Auth(Some("Invalid identity token.".into())));
        }
        let mut state = self.state.lock();
        let user_id = state
            .credentials
            .entry(id_token.to_string())
            .or_insert_with(|| UserId::new(Ulid::new().to_string()))
            .clone();
        let session = Session {
            user_id,
            email: None,
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn create_account(&self, email: &str, password: &str) -> AppResult<Session> {
        self.check(Op::CreateAccount)?;
        let mut state = self.state.lock();
        if state.accounts.contains_key(email) {
            return Err(AppError::Auth(Some(
                "The email address is already in use by another account.".into(),
            )));
        }
        let user_id = UserId::new(Ulid::new().to_string());
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), user_id.clone()));
        let session = Session {
            user_id,
            email: Some(email.to_string()),
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.check(Op::SignOut)?;
        self.state.lock().session = None;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn get_document(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let key = document_key(collection, id);
        let delay = {
            let mut state = self.state.lock();
            *state.reads.entry(key.clone()).or_insert(0) += 1;
            state.read_delay
        };
        self.total_reads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check(Op::GetDocument)?;
        Ok(self.state.lock().documents.get(&key).cloned())
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
        merge: bool,
    ) -> AppResult<()> {
        self.check(Op::SetDocument)?;
        let mut state = self.state.lock();
        let key = document_key(collection, id);
        match state.documents.get_mut(&key) {
            Some(existing) if merge => merge_into(existing, doc),
            _ => {
                state.documents.insert(key, doc);
            }
        }
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> AppResult<()> {
        self.check(Op::UpdateField)?;
        let key = document_key(collection, id);
        let mut state = self.state.lock();
        let doc = state
            .documents
            .get_mut(&key)
            .ok_or_else(|| AppError::NotFound(key.clone()))?;
        doc.insert(field.to_string(), value);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> AppResult<()> {
        self.check(Op::DeleteDocument)?;
        self.state
            .lock()
            .documents
            .remove(&document_key(collection, id));
        Ok(())
    }

    async fn list_documents(&self, collection: &str) -> AppResult<Vec<(String, Document)>> {
        self.check(Op::ListDocuments)?;
        let state = self.state.lock();
        Ok(state
            .documents
            .iter()
            .filter_map(|(key, doc)| is_direct_child(key, collection).map(|id| (id, doc.clone())))
            .collect())
    }

    async fn add_document(&self, collection: &str, doc: Document) -> AppResult<String> {
        self.check(Op::SetDocument)?;
        let id = Ulid::new().to_string();
        self.state
            .lock()
            .documents
            .insert(document_key(collection, &id), doc);
        Ok(id)
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn put_file(&self, path: &str, bytes: Bytes) -> AppResult<String> {
        self.check(Op::PutFile)?;
        self.state.lock().blobs.insert(path.to_string(), bytes);
        Ok(format!("memory://{}", path))
    }
}
