//! Error types for the AgriSoko client

use thiserror::Error;

/// Main error type for AgriSoko client operations
#[derive(Error, Debug)]
pub enum AppError {
    /// The collaborator refused the operation (security rules, revoked access)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A record the operation depends on does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transient transport failure talking to a collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// A remote read did not complete within the configured timeout
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Credentials rejected or account creation refused.
    ///
    /// Carries the collaborator's message when it supplied one.
    #[error("Authentication error: {}", .0.as_deref().unwrap_or("no detail"))]
    Auth(Option<String>),

    /// A write (role save, product delete, order update) failed
    #[error("Write failed: {0}")]
    Write(String),

    /// Local input validation failed before any collaborator call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A stored record could not be interpreted
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Generic message shown for transient read failures.
pub const GENERIC_READ_FAILURE: &str = "Something went wrong. Please check your connection.";

impl AppError {
    /// True for failures that may succeed if the user tries again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Timeout(_))
    }

    /// Convert the error into the string a screen shows the user.
    ///
    /// Transient failures collapse to a generic message; auth and write
    /// failures keep the collaborator's wording, falling back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if self.is_transient() {
            return GENERIC_READ_FAILURE.to_string();
        }
        match self {
            AppError::Auth(Some(msg)) if !msg.is_empty() => msg.clone(),
            AppError::Write(msg) | AppError::PermissionDenied(msg) if !msg.is_empty() => {
                msg.clone()
            }
            AppError::Validation(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}
