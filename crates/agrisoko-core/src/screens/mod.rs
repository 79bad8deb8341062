//! Screen presenters.
//!
//! Each presenter holds the transient state of one screen (form fields,
//! busy flag, the error string shown near the triggering control) and turns
//! user input into calls on [`AgriClient`](crate::AgriClient). Collaborator
//! failures stop here: presenters convert them into user-visible strings and
//! never propagate them further.
//!
//! The splash screen has no state of its own; it is
//! [`AgriClient::launch`](crate::AgriClient::launch).

mod customer;
mod farmer;
mod login;
mod register;
mod role_selection;

pub use customer::CustomerHome;
pub use farmer::FarmerDashboard;
pub use login::LoginScreen;
pub use register::{validate as validate_registration, FieldErrors, RegisterScreen};
pub use role_selection::RoleSelectionScreen;

use crate::navigator::Destination;

/// Result of loading a dashboard.
#[derive(Debug)]
pub enum Loaded<T> {
    Ready(T),
    /// The record belongs somewhere else; the navigator already moved there
    Redirected(Destination),
    /// A logout or newer resolution overtook the load; nothing was shown
    Discarded,
}

impl<T> Loaded<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Loaded::Ready(value) => Some(value),
            Loaded::Redirected(_) | Loaded::Discarded => None,
        }
    }
}
