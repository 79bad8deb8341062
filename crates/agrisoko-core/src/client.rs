//! AgriClient - the app controller.
//!
//! AgriClient owns the injected collaborators, one [`RoleResolver`] and one
//! [`Navigator`] for the lifetime of the app. Every flow that can move the
//! user to another screen goes through here:
//! - Cold start: splash, then a full session/role resolution
//! - Login, Google sign-in, registration, role selection, logout
//! - Plain navigation between login and register
//!
//! # Example
//!
//! ```ignore
//! use agrisoko_core::{AgriClient, ClientConfig, Collaborators, LocalBackend};
//!
//! let backend = Arc::new(LocalBackend::open("~/.agrisoko/data/agrisoko.redb")?);
//! let client = AgriClient::new(Collaborators::from_backend(backend), ClientConfig::default());
//!
//! match client.launch().await {
//!     Destination::Login => { /* show login */ }
//!     Destination::FarmerHome => { /* load dashboard */ }
//!     _ => {}
//! }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::backend::{AuthProvider, BlobStore, DocumentStore};
use crate::config::ClientConfig;
use crate::error::{AppError, AppResult};
use crate::navigator::{Destination, Navigator};
use crate::resolver::{ResolverState, RoleResolver, Ticket};
use crate::roles::RoleStore;
use crate::session::SessionProbe;
use crate::types::{Role, RoleLookup, Session, UserId, UserRecord};

/// Capacity of the navigation event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications for whoever renders the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The visible destination changed
    Navigated {
        from: Destination,
        to: Destination,
        /// Error banner to show with the new destination
        banner: Option<String>,
    },
    /// A resolution finished after it had been superseded and was dropped
    ResolutionDiscarded { epoch: u64 },
}

/// The three collaborator capabilities, injected as trait objects.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Collaborators {
    /// Use one backend for all three capabilities.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthProvider + DocumentStore + BlobStore + 'static,
    {
        Self {
            auth: backend.clone(),
            store: backend.clone(),
            blobs: backend,
        }
    }
}

/// Input collected by the registration screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

pub struct AgriClient {
    collab: Collaborators,
    resolver: RoleResolver,
    navigator: Mutex<Navigator>,
    config: ClientConfig,
    event_tx: broadcast::Sender<AppEvent>,
}

impl AgriClient {
    pub fn new(collab: Collaborators, config: ClientConfig) -> Self {
        let resolver = RoleResolver::new(
            SessionProbe::new(collab.auth.clone()),
            RoleStore::new(collab.store.clone()),
        )
        .with_timeout(config.resolve_timeout());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            collab,
            resolver,
            navigator: Mutex::new(Navigator::new()),
            config,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    pub fn current_session(&self) -> Option<Session> {
        self.resolver.probe().current_session()
    }

    /// The signed-in session, or an auth error if there is none.
    pub fn require_session(&self) -> AppResult<Session> {
        self.current_session()
            .ok_or_else(|| AppError::Auth(Some("You are not signed in.".into())))
    }

    /// Read `users/{id}`, bounded by the resolve timeout.
    pub async fn fetch_user_record(&self, user_id: &UserId) -> AppResult<Option<UserRecord>> {
        tokio::time::timeout(
            self.config.resolve_timeout(),
            self.resolver.roles().fetch_record(user_id),
        )
        .await
        .map_err(|_| AppError::Timeout(self.config.resolve_timeout_ms))?
    }

    pub fn current_destination(&self) -> Destination {
        self.navigator.lock().current()
    }

    pub fn banner(&self) -> Option<String> {
        self.navigator.lock().banner().map(str::to_string)
    }

    pub fn navigator(&self) -> Navigator {
        self.navigator.lock().clone()
    }

    pub fn resolver_state(&self) -> ResolverState {
        self.resolver.state()
    }

    fn navigate(&self, state: &ResolverState) -> Destination {
        let (from, to, banner) = {
            let mut nav = self.navigator.lock();
            let from = nav.current();
            let to = nav.transition(state);
            (from, to, nav.banner().map(str::to_string))
        };
        let _ = self.event_tx.send(AppEvent::Navigated { from, to, banner });
        to
    }

    /// Navigate to a settled outcome. `None` means `ticket` went stale and
    /// its result was dropped.
    fn apply(&self, ticket: Ticket, outcome: Option<ResolverState>) -> Option<Destination> {
        match outcome {
            Some(state) => Some(self.navigate(&state)),
            None => {
                let _ = self.event_tx.send(AppEvent::ResolutionDiscarded {
                    epoch: ticket.epoch,
                });
                None
            }
        }
    }

    /// Cold start: show the splash for the configured delay, then resolve.
    ///
    /// The splash delay is not cancelable; the resolution that follows is.
    pub async fn launch(&self) -> Destination {
        self.navigator.lock().cold_start();
        info!(delay_ms = self.config.splash_delay_ms, "Splash");
        tokio::time::sleep(self.config.splash_delay()).await;
        self.refresh().await
    }

    /// Re-run the session/role resolution and move to its destination.
    pub async fn refresh(&self) -> Destination {
        let ticket = self.resolver.begin();
        let outcome = self.resolver.resolve(ticket).await;
        self.apply(ticket, outcome)
            .unwrap_or_else(|| self.current_destination())
    }

    /// Start a resolution that a screen finishes itself, after doing its
    /// own reads. Anything that begins later supersedes it.
    pub fn begin_resolution(&self) -> Ticket {
        self.resolver.begin()
    }

    /// Decide from a lookup read under `ticket` and navigate.
    ///
    /// Returns `None` without navigating when the ticket went stale.
    pub fn finish_resolution(
        &self,
        ticket: Ticket,
        lookup: AppResult<RoleLookup>,
    ) -> Option<Destination> {
        let outcome = self
            .resolver
            .settle(ticket, ResolverState::from_lookup(lookup));
        self.apply(ticket, outcome)
    }

    /// Drop any outstanding resolution (its screen went away).
    pub fn cancel_pending(&self) {
        self.resolver.cancel();
    }

    /// Resolve for a session the caller just obtained.
    async fn resolve_session(&self, session: &Session) -> Destination {
        let ticket = self.resolver.begin();
        let lookup = self.resolver.fetch_role(&session.user_id).await;
        self.finish_resolution(ticket, lookup)
            .unwrap_or_else(|| self.current_destination())
    }

    /// Email/password login. Auth failures leave the navigator untouched.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Destination> {
        let session = self
            .collab
            .auth
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(|e| {
                warn!(error = %e, "Login failed");
                e
            })?;
        info!(user_id = %session.user_id, "Logged in");
        Ok(self.resolve_session(&session).await)
    }

    /// Sign in with a Google identity token.
    pub async fn sign_in_with_google(&self, id_token: &str) -> AppResult<Destination> {
        let session = self
            .collab
            .auth
            .sign_in_with_credential(id_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "Google sign-in failed");
                e
            })?;
        info!(user_id = %session.user_id, "Signed in with Google");
        Ok(self.resolve_session(&session).await)
    }

    /// Create the account and its record; the chosen role decides the
    /// destination directly.
    pub async fn register(&self, registration: &Registration) -> AppResult<Destination> {
        let role = registration
            .role
            .ok_or_else(|| AppError::Validation("Please select a role.".into()))?;

        let session = self
            .collab
            .auth
            .create_account(registration.email.trim(), &registration.password)
            .await?;

        let record = UserRecord::registered(
            registration.email.trim(),
            registration.name.trim(),
            registration.phone_number.trim(),
            role,
        );
        self.resolver
            .roles()
            .create_record(&session.user_id, &record)
            .await?;

        info!(user_id = %session.user_id, %role, "Registered");
        let state = self.resolver.resolve_role(role);
        Ok(self.navigate(&state))
    }

    /// Persist the picked role and go straight to its home, without re-reading.
    pub async fn select_role(&self, role: Role) -> AppResult<Destination> {
        let session = self.require_session()?;
        self.resolver.roles().save_role(&session.user_id, role).await?;
        let state = self.resolver.resolve_role(role);
        Ok(self.navigate(&state))
    }

    pub async fn logout(&self) -> AppResult<Destination> {
        self.collab.auth.sign_out().await?;
        let state = self.resolver.sign_out();
        Ok(self.navigate(&state))
    }

    pub fn open_register(&self) -> Destination {
        self.push(Destination::Register)
    }

    pub fn open_login(&self) -> Destination {
        self.push(Destination::Login)
    }

    fn push(&self, destination: Destination) -> Destination {
        let from = {
            let mut nav = self.navigator.lock();
            let from = nav.current();
            nav.push(destination);
            from
        };
        let _ = self.event_tx.send(AppEvent::Navigated {
            from,
            to: destination,
            banner: None,
        });
        destination
    }

    /// One step back. `None` when there is nothing below the current screen.
    pub fn back(&self) -> Option<Destination> {
        let (from, to) = {
            let mut nav = self.navigator.lock();
            let from = nav.current();
            (from, nav.back()?)
        };
        let _ = self.event_tx.send(AppEvent::Navigated {
            from,
            to,
            banner: None,
        });
        Some(to)
    }
}
