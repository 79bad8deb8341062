//! Customer home.

use super::Loaded;
use crate::client::AgriClient;
use crate::roles::lookup_from_read;
use crate::types::{Role, RoleLookup, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerHome {
    pub user_id: UserId,
    pub name: Option<String>,
}

impl CustomerHome {
    pub async fn load(client: &AgriClient) -> Loaded<Self> {
        let Some(session) = client.current_session() else {
            return Loaded::Redirected(client.refresh().await);
        };
        let user_id = session.user_id;
        let ticket = client.begin_resolution();

        let read = client.fetch_user_record(&user_id).await;
        if let Ok(Some(record)) = &read {
            if record.role_lookup() == RoleLookup::Assigned(Role::Customer) {
                if client
                    .finish_resolution(ticket, Ok(RoleLookup::Assigned(Role::Customer)))
                    .is_none()
                {
                    return Loaded::Discarded;
                }
                return Loaded::Ready(Self {
                    user_id,
                    name: record.name.clone().filter(|n| !n.trim().is_empty()),
                });
            }
        }

        let read = read.map(|found| found.map(|record| record.role_lookup()));
        match client.finish_resolution(ticket, lookup_from_read(&user_id, read)) {
            Some(to) => Loaded::Redirected(to),
            None => Loaded::Discarded,
        }
    }

    pub fn greeting(&self) -> String {
        match &self.name {
            Some(name) => format!("Welcome, {}", name),
            None => "Welcome Customer".to_string(),
        }
    }
}
