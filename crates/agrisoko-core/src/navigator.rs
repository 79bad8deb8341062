//! Destination router with a back-stack.
//!
//! The resolver decides *what* the user should see; the navigator owns the
//! stack and the clearing rules that keep "back" from leaking across session
//! boundaries:
//!
//! | Resolver state       | Destination     | Stack afterwards           |
//! |----------------------|-----------------|----------------------------|
//! | `Unauthenticated`    | `login`         | `[login]`                  |
//! | `ResolvedFarmer`     | `farmer_home`   | `[farmer_home]`            |
//! | `ResolvedCustomer`   | `customer_home` | `[customer_home]`          |
//! | `NeedsRoleSelection` | `role_selection`| `[role_selection]`         |
//! | `Failed`             | `login`         | `[login]` + error banner   |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::resolver::ResolverState;

/// Every screen the app can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Splash,
    Login,
    Register,
    RoleSelection,
    FarmerHome,
    CustomerHome,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Splash => "splash",
            Destination::Login => "login",
            Destination::Register => "register",
            Destination::RoleSelection => "role_selection",
            Destination::FarmerHome => "farmer_home",
            Destination::CustomerHome => "customer_home",
        }
    }

    /// Screens only reachable with a session.
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Destination::RoleSelection | Destination::FarmerHome | Destination::CustomerHome
        )
    }

    /// Destination a terminal resolver state maps to. `Loading` has none.
    pub fn for_state(state: &ResolverState) -> Option<Self> {
        match state {
            ResolverState::Loading => None,
            ResolverState::Unauthenticated | ResolverState::Failed(_) => Some(Destination::Login),
            ResolverState::ResolvedFarmer => Some(Destination::FarmerHome),
            ResolverState::ResolvedCustomer => Some(Destination::CustomerHome),
            ResolverState::NeedsRoleSelection => Some(Destination::RoleSelection),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "splash" => Ok(Destination::Splash),
            "login" => Ok(Destination::Login),
            "register" => Ok(Destination::Register),
            "role_selection" => Ok(Destination::RoleSelection),
            "farmer_home" => Ok(Destination::FarmerHome),
            "customer_home" => Ok(Destination::CustomerHome),
            other => Err(AppError::Validation(format!("unknown destination '{}'", other))),
        }
    }
}

/// Back-stack router. The stack is never empty.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Destination>,
    banner: Option<String>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    /// A navigator on the splash screen, as at cold start.
    pub fn new() -> Self {
        Self {
            stack: vec![Destination::Splash],
            banner: None,
        }
    }

    /// Reset to `[splash]`.
    pub fn cold_start(&mut self) {
        self.stack.clear();
        self.stack.push(Destination::Splash);
        self.banner = None;
        debug!("Navigator cold start");
    }

    pub fn current(&self) -> Destination {
        // The stack is never empty: every mutation leaves at least a root.
        self.stack.last().copied().unwrap_or(Destination::Splash)
    }

    pub fn stack(&self) -> &[Destination] {
        &self.stack
    }

    /// Error surfaced alongside the current destination, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// User-initiated navigation (login ⇄ register).
    ///
    /// Session screens are only entered through [`Navigator::transition`];
    /// pushing one leaves the navigator where it is.
    pub fn push(&mut self, destination: Destination) -> Destination {
        if destination.requires_session() {
            warn!(%destination, "Refusing to push a session screen");
            return self.current();
        }
        self.banner = None;
        if self.current() != destination {
            self.stack.push(destination);
        }
        debug!(%destination, depth = self.stack.len(), "Pushed");
        destination
    }

    /// Pop one entry. The root is never popped; returns the new current
    /// destination or `None` if already at the root.
    pub fn back(&mut self) -> Option<Destination> {
        if self.stack.len() <= 1 {
            return None;
        }
        self.stack.pop();
        self.banner = None;
        Some(self.current())
    }

    /// Apply a resolver decision. Every terminal state replaces the whole
    /// stack; `Loading` leaves the navigator where it is.
    pub fn transition(&mut self, state: &ResolverState) -> Destination {
        let Some(destination) = Destination::for_state(state) else {
            return self.current();
        };

        let from = self.current();
        self.stack.clear();
        self.stack.push(destination);
        self.banner = state.error_message().map(str::to_string);

        info!(%from, to = %destination, %state, "Navigated");
        destination
    }
}
