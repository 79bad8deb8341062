//! Role resolver - decides where a user belongs after every auth event.
//!
//! ```text
//!                 ┌──────────────┐ no session  ┌─────────────────┐
//!   trigger ────▶ │   Loading    │ ──────────▶ │ Unauthenticated │
//!                 └──────┬───────┘             └─────────────────┘
//!                        │ session: read users/{id}.role
//!        ┌───────────────┼─────────────────┬──────────────────────┐
//!        ▼               ▼                 ▼                      ▼
//!  ResolvedFarmer  ResolvedCustomer  NeedsRoleSelection        Failed
//!   ("farmer")      ("customer")    (absent/unknown)   (denied/timeout)
//! ```
//!
//! Every trigger starts a new resolution epoch. A result is only applied if
//! its epoch is still the current one, so a read that completes after the
//! user moved on (or after a newer trigger) is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::roles::RoleStore;
use crate::session::SessionProbe;
use crate::types::{Role, RoleLookup, UserId};

/// Default upper bound on a single role read.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Message attached to `Failed` when the collaborator gave none.
pub const ROLE_READ_FAILURE: &str = "Failed to retrieve user role.";

/// State of the role resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Loading,
    Unauthenticated,
    ResolvedFarmer,
    ResolvedCustomer,
    NeedsRoleSelection,
    /// Resolution failed; carries the message to show on the login screen
    Failed(String),
}

impl ResolverState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResolverState::Loading)
    }

    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Farmer => ResolverState::ResolvedFarmer,
            Role::Customer => ResolverState::ResolvedCustomer,
        }
    }

    /// The decision table for a completed role read.
    pub fn from_lookup(lookup: AppResult<RoleLookup>) -> Self {
        match lookup {
            Ok(RoleLookup::Assigned(role)) => Self::for_role(role),
            Ok(RoleLookup::Unassigned) | Ok(RoleLookup::Unknown(_)) => {
                ResolverState::NeedsRoleSelection
            }
            Err(e) => ResolverState::Failed(e.user_message(ROLE_READ_FAILURE)),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResolverState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverState::Loading => write!(f, "Loading"),
            ResolverState::Unauthenticated => write!(f, "Unauthenticated"),
            ResolverState::ResolvedFarmer => write!(f, "ResolvedFarmer"),
            ResolverState::ResolvedCustomer => write!(f, "ResolvedCustomer"),
            ResolverState::NeedsRoleSelection => write!(f, "NeedsRoleSelection"),
            ResolverState::Failed(msg) => write!(f, "Failed({})", msg),
        }
    }
}

/// Handle for one resolution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub epoch: u64,
}

/// The single authority on where the current user belongs.
pub struct RoleResolver {
    probe: SessionProbe,
    roles: RoleStore,
    epoch: AtomicU64,
    state: Mutex<ResolverState>,
    timeout: Duration,
}

impl RoleResolver {
    pub fn new(probe: SessionProbe, roles: RoleStore) -> Self {
        Self {
            probe,
            roles,
            epoch: AtomicU64::new(0),
            state: Mutex::new(ResolverState::Loading),
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> ResolverState {
        self.state.lock().clone()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current_epoch() == ticket.epoch
    }

    /// Start a new cycle: supersedes any outstanding one and resets to `Loading`.
    pub fn begin(&self) -> Ticket {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock() = ResolverState::Loading;
        debug!(epoch, "Resolution started");
        Ticket { epoch }
    }

    /// Abandon the outstanding cycle, e.g. when its screen is torn down.
    pub fn cancel(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(epoch, "Outstanding resolution cancelled");
    }

    /// Apply `state` if `ticket` is still current. Returns `None` when the
    /// cycle was superseded and the result was dropped.
    pub fn settle(&self, ticket: Ticket, state: ResolverState) -> Option<ResolverState> {
        let mut current = self.state.lock();
        if self.epoch.load(Ordering::SeqCst) != ticket.epoch {
            warn!(
                epoch = ticket.epoch,
                current = self.epoch.load(Ordering::SeqCst),
                %state,
                "Discarding stale resolution"
            );
            return None;
        }
        info!(epoch = ticket.epoch, %state, "Resolved");
        *current = state.clone();
        Some(state)
    }

    /// Read the role of `user_id`, bounded by the resolver timeout.
    pub async fn fetch_role(&self, user_id: &UserId) -> AppResult<RoleLookup> {
        match tokio::time::timeout(self.timeout, self.roles.fetch_role(user_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%user_id, timeout_ms = self.timeout.as_millis() as u64, "Role read timed out");
                Err(AppError::Timeout(self.timeout.as_millis() as u64))
            }
        }
    }

    /// Full cycle for `ticket`: probe the session, read the role if signed
    /// in, decide.
    ///
    /// Returns `None` if a newer trigger superseded this cycle.
    pub async fn resolve(&self, ticket: Ticket) -> Option<ResolverState> {
        let state = match self.probe.current_session() {
            None => ResolverState::Unauthenticated,
            Some(session) => ResolverState::from_lookup(self.fetch_role(&session.user_id).await),
        };
        self.settle(ticket, state)
    }

    /// Registration or role selection fixed the role; no read needed.
    pub fn resolve_role(&self, role: Role) -> ResolverState {
        let ticket = self.begin();
        let state = ResolverState::for_role(role);
        self.settle(ticket, state.clone());
        state
    }

    /// Session ended.
    pub fn sign_out(&self) -> ResolverState {
        let ticket = self.begin();
        self.settle(ticket, ResolverState::Unauthenticated);
        ResolverState::Unauthenticated
    }

    pub fn roles(&self) -> &RoleStore {
        &self.roles
    }

    pub fn probe(&self) -> &SessionProbe {
        &self.probe
    }
}
