//! Registration screen: account details plus the initial role.

use crate::client::{AgriClient, Registration};
use crate::error::AppError;
use crate::navigator::Destination;
use crate::types::Role;

pub const NAME_EMPTY: &str = "Name cannot be empty";
pub const PHONE_INVALID: &str = "Phone number should be at least 10 digits and numeric";
pub const EMAIL_INVALID: &str = "Invalid email address";
pub const PASSWORD_TOO_SHORT: &str = "Password should be at least 6 characters";
pub const ROLE_MISSING: &str = "Please select a role.";
pub const REGISTRATION_FAILED: &str = "Registration failed.";
pub const SAVE_DETAILS_FAILED: &str = "Failed to save user details. Please try again";

const MIN_PHONE_DIGITS: usize = 10;
const MIN_PASSWORD_LEN: usize = 6;

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub name: Option<&'static str>,
    pub phone_number: Option<&'static str>,
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone_number.is_none()
            && self.email.is_none()
            && self.password.is_none()
    }
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

/// Check the form locally.
pub fn validate(registration: &Registration) -> FieldErrors {
    let phone = registration.phone_number.trim();
    FieldErrors {
        name: registration.name.trim().is_empty().then_some(NAME_EMPTY),
        phone_number: (phone.len() < MIN_PHONE_DIGITS
            || !phone.chars().all(|c| c.is_ascii_digit()))
        .then_some(PHONE_INVALID),
        email: (!looks_like_email(registration.email.trim())).then_some(EMAIL_INVALID),
        password: (registration.password.len() < MIN_PASSWORD_LEN).then_some(PASSWORD_TOO_SHORT),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterScreen {
    pub form: Registration,
    field_errors: FieldErrors,
    error: Option<String>,
}

impl RegisterScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn select_role(&mut self, role: Role) {
        self.form.role = Some(role);
    }

    /// Submit is only enabled while every field validates.
    pub fn can_submit(&self) -> bool {
        validate(&self.form).is_empty()
    }

    pub async fn submit(&mut self, client: &AgriClient) -> Option<Destination> {
        self.field_errors = validate(&self.form);
        if !self.field_errors.is_empty() {
            return None;
        }
        if self.form.role.is_none() {
            self.error = Some(ROLE_MISSING.to_string());
            return None;
        }

        self.error = None;
        match client.register(&self.form).await {
            Ok(destination) => Some(destination),
            Err(AppError::Write(_)) => {
                self.error = Some(SAVE_DETAILS_FAILED.to_string());
                None
            }
            Err(e) => {
                self.error = Some(e.user_message(REGISTRATION_FAILED));
                None
            }
        }
    }

    pub fn open_login(&self, client: &AgriClient) -> Destination {
        client.open_login()
    }
}
