//! Login screen: email/password and Google sign-in.

use tracing::debug;

use crate::client::AgriClient;
use crate::navigator::Destination;

pub const AUTH_FAILED: &str = "Authentication failed.";
pub const GOOGLE_SIGN_IN_FAILED: &str = "Google Sign-In Failed";
pub const MISSING_CREDENTIALS: &str = "Please enter your email and password.";

#[derive(Debug, Clone, Default)]
pub struct LoginScreen {
    pub email: String,
    pub password: String,
    error: Option<String>,
    busy: bool,
}

impl LoginScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message shown under the form, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn can_submit(&self) -> bool {
        !self.busy && !self.email.trim().is_empty() && !self.password.is_empty()
    }

    /// Submit the form. Returns the destination on success; on failure the
    /// message is available from [`LoginScreen::error`].
    pub async fn submit(&mut self, client: &AgriClient) -> Option<Destination> {
        if !self.can_submit() {
            self.error = Some(MISSING_CREDENTIALS.to_string());
            return None;
        }

        self.busy = true;
        self.error = None;
        let result = client.login(&self.email, &self.password).await;
        self.busy = false;

        self.finish(client, result.map_err(|e| e.user_message(AUTH_FAILED)))
    }

    /// Complete Google sign-in. `id_token` is `None` when the account picker
    /// was dismissed or returned no token.
    pub async fn sign_in_with_google(
        &mut self,
        client: &AgriClient,
        id_token: Option<&str>,
    ) -> Option<Destination> {
        let Some(id_token) = id_token else {
            self.error = Some(GOOGLE_SIGN_IN_FAILED.to_string());
            return None;
        };

        self.busy = true;
        self.error = None;
        let result = client.sign_in_with_google(id_token).await;
        self.busy = false;

        self.finish(
            client,
            result.map_err(|e| e.user_message(GOOGLE_SIGN_IN_FAILED)),
        )
    }

    pub fn open_register(&self, client: &AgriClient) -> Destination {
        client.open_register()
    }

    fn finish(
        &mut self,
        client: &AgriClient,
        result: Result<Destination, String>,
    ) -> Option<Destination> {
        match result {
            Ok(destination) => {
                // A failed role read lands back on login with a banner.
                if destination == Destination::Login {
                    self.error = client.banner();
                } else {
                    self.password.clear();
                }
                Some(destination)
            }
            Err(message) => {
                debug!(%message, "Login rejected");
                self.error = Some(message);
                None
            }
        }
    }
}
