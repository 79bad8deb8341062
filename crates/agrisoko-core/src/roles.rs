//! Role store accessor: reads and writes the `role` attribute of `users/{id}`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{Document, DocumentStore};
use crate::error::{AppError, AppResult};
use crate::types::{
    role_lookup_from_document, Role, RoleLookup, UnknownReason, UserId, UserRecord,
    USERS_COLLECTION,
};

#[derive(Clone)]
pub struct RoleStore {
    store: Arc<dyn DocumentStore>,
}

impl RoleStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Read the role of `user_id`.
    ///
    /// Missing records and transient failures come back as
    /// `RoleLookup::Unknown` with the reason kept. Permission errors and
    /// unreadable records are hard failures and come back as `Err`.
    pub async fn fetch_role(&self, user_id: &UserId) -> AppResult<RoleLookup> {
        let read = self
            .store
            .get_document(USERS_COLLECTION, user_id.as_str())
            .await
            .and_then(|doc| doc.as_ref().map(role_lookup_from_document).transpose());
        let lookup = lookup_from_read(user_id, read);
        debug!(%user_id, ?lookup, "Fetched role");
        lookup
    }

    /// Read the whole `users/{id}` record.
    pub async fn fetch_record(&self, user_id: &UserId) -> AppResult<Option<UserRecord>> {
        match self
            .store
            .get_document(USERS_COLLECTION, user_id.as_str())
            .await?
        {
            Some(doc) => Ok(Some(UserRecord::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// Persist the chosen role. Merges into the record so accounts created
    /// through an external identity provider get a record on first choice.
    pub async fn save_role(&self, user_id: &UserId, role: Role) -> AppResult<()> {
        let mut doc = Document::new();
        doc.insert("role".to_string(), Value::from(role.as_str()));
        self.store
            .set_document(USERS_COLLECTION, user_id.as_str(), doc, true)
            .await
            .map_err(into_write_failure)?;
        info!(%user_id, %role, "Saved role");
        Ok(())
    }

    /// Create `users/{id}` at registration.
    pub async fn create_record(&self, user_id: &UserId, record: &UserRecord) -> AppResult<()> {
        self.store
            .set_document(
                USERS_COLLECTION,
                user_id.as_str(),
                record.to_document()?,
                false,
            )
            .await
            .map_err(into_write_failure)
    }
}

/// Interpret the result of reading `users/{id}` as a role lookup.
///
/// Missing records and transient failures come back as
/// `RoleLookup::Unknown` with the reason kept. Permission errors and
/// unreadable records are hard failures and stay `Err`.
pub fn lookup_from_read(
    user_id: &UserId,
    read: AppResult<Option<RoleLookup>>,
) -> AppResult<RoleLookup> {
    match read {
        Ok(Some(lookup)) => Ok(lookup),
        Ok(None) | Err(AppError::NotFound(_)) => {
            warn!(%user_id, "User record missing");
            Ok(RoleLookup::Unknown(UnknownReason::Missing))
        }
        Err(AppError::Network(msg)) => {
            warn!(%user_id, error = %msg, "Role read failed transiently");
            Ok(RoleLookup::Unknown(UnknownReason::Unreachable(msg)))
        }
        Err(e) => {
            warn!(%user_id, error = %e, "Role read failed");
            Err(e)
        }
    }
}

/// Writes surface as `Write` failures; permission errors keep their kind.
pub(crate) fn into_write_failure(e: AppError) -> AppError {
    match e {
        AppError::Write(_) | AppError::PermissionDenied(_) | AppError::Validation(_) => e,
        other => AppError::Write(other.to_string()),
    }
}
