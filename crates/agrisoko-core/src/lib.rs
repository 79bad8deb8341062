//! AgriSoko Core Library
//!
//! Session and role resolution, navigation and screen presenters for the
//! AgriSoko farmer/customer marketplace client.
//!
//! ## Overview
//!
//! On every entry point (cold start, login, Google sign-in, registration,
//! role selection, logout) the client decides which screen the user belongs
//! on. The decision is made by one [`RoleResolver`] and applied by one
//! [`Navigator`]:
//!
//! ```text
//!   SessionProbe ──none──────────────────────────────▶ Unauthenticated ─▶ login
//!        │
//!      session
//!        ▼
//!   RoleStore::fetch_role ──farmer───────────────────▶ ResolvedFarmer  ─▶ farmer_home
//!        │                 ──customer─────────────────▶ ResolvedCustomer ─▶ customer_home
//!        │                 ──unassigned / unknown────▶ NeedsRoleSelection ─▶ role_selection
//!        └──────────────── ──hard failure / timeout──▶ Failed(msg) ─▶ login + banner
//! ```
//!
//! Auth, documents and blobs are injected collaborators (see [`backend`]),
//! so the same client runs against the local redb emulator or the in-memory
//! test double.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use agrisoko_core::{AgriClient, ClientConfig, Collaborators, LocalBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(LocalBackend::open("agrisoko.redb")?);
//!     let client = AgriClient::new(Collaborators::from_backend(backend), ClientConfig::default());
//!
//!     println!("start at {}", client.launch().await);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigator;
pub mod profile;
pub mod resolver;
pub mod roles;
pub mod screens;
pub mod session;
pub mod types;

// Re-exports
pub use backend::{
    AuthProvider, BlobStore, Document, DocumentStore, Fault, LocalBackend, MemoryBackend, Op,
};
pub use client::{AgriClient, AppEvent, Collaborators, Registration};
pub use config::ClientConfig;
pub use error::{AppError, AppResult};
pub use navigator::{Destination, Navigator};
pub use resolver::{ResolverState, RoleResolver, Ticket};
pub use roles::RoleStore;
pub use session::SessionProbe;
pub use types::*;
