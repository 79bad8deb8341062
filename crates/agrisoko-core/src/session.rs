//! Session probe: is anyone signed in, and who.

use std::sync::Arc;

use tracing::debug;

use crate::backend::AuthProvider;
use crate::types::Session;

/// Thin view over the auth collaborator's cached session.
#[derive(Clone)]
pub struct SessionProbe {
    auth: Arc<dyn AuthProvider>,
}

impl SessionProbe {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth }
    }

    /// The current session, if any. Absence is a normal answer, never an error.
    pub fn current_session(&self) -> Option<Session> {
        let session = self.auth.current_session();
        debug!(
            user_id = session.as_ref().map(|s| s.user_id.as_str()).unwrap_or("-"),
            "Probed session"
        );
        session
    }
}
