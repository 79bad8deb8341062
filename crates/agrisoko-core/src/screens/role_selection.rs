//! Role selection, shown to accounts without a usable role.

use crate::client::AgriClient;
use crate::navigator::Destination;
use crate::types::Role;

pub const SAVE_ROLE_FAILED: &str = "Failed to save role.";

#[derive(Debug, Clone, Default)]
pub struct RoleSelectionScreen {
    selected: Option<Role>,
    error: Option<String>,
}

impl RoleSelectionScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, role: Role) {
        self.selected = Some(role);
        self.error = None;
    }

    pub fn selected(&self) -> Option<Role> {
        self.selected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Save the selection and move to its home screen.
    pub async fn confirm(&mut self, client: &AgriClient) -> Option<Destination> {
        let role = self.selected?;
        match client.select_role(role).await {
            Ok(destination) => Some(destination),
            Err(e) => {
                self.error = Some(e.user_message(SAVE_ROLE_FAILED));
                None
            }
        }
    }
}
