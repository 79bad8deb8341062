//! End-to-end resolution scenarios against the in-memory backend.
//!
//! Each test builds an [`AgriClient`] over a [`MemoryBackend`] and drives it
//! through the public flows, checking both the resolver state and where the
//! navigator ends up.

use std::sync::Arc;
use std::time::Duration;

use agrisoko_core::screens::{CustomerHome, FarmerDashboard, Loaded};
use agrisoko_core::{
    AgriClient, AppError, AppEvent, ClientConfig, Collaborators, Destination, Document, Fault,
    MemoryBackend, Op, ResolverState, Role, Session, UserRecord,
};
use serde_json::Value;

fn client_with(backend: &Arc<MemoryBackend>) -> AgriClient {
    let config = ClientConfig {
        splash_delay_ms: 0,
        ..Default::default()
    };
    AgriClient::new(Collaborators::from_backend(backend.clone()), config)
}

fn farmer(name: &str) -> UserRecord {
    UserRecord::registered(
        format!("{}@agri.co.ke", name.to_lowercase()),
        name,
        "0712345678",
        Role::Farmer,
    )
}

fn customer(name: &str) -> UserRecord {
    UserRecord::registered(
        format!("{}@agri.co.ke", name.to_lowercase()),
        name,
        "0798765432",
        Role::Customer,
    )
}

// ============================================================================
// Cold start
// ============================================================================

#[tokio::test]
async fn no_session_goes_to_login_without_reading() {
    let backend = Arc::new(MemoryBackend::new());
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::Login);
    assert_eq!(client.resolver_state(), ResolverState::Unauthenticated);
    assert_eq!(backend.total_reads(), 0);
    assert_eq!(client.banner(), None);
}

#[tokio::test]
async fn farmer_record_goes_to_farmer_home() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user("U1", &farmer("Amina"));
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::FarmerHome);
    assert_eq!(client.resolver_state(), ResolverState::ResolvedFarmer);
    assert_eq!(backend.reads_of("users", "U1"), 1);
}

#[tokio::test]
async fn customer_record_goes_to_customer_home() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user("C1", &customer("Baraka"));
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::CustomerHome);
    assert_eq!(client.resolver_state(), ResolverState::ResolvedCustomer);
}

#[tokio::test]
async fn record_without_role_needs_selection() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U2")));
    backend.put_user(
        "U2",
        &UserRecord {
            name: Some("Wanjiru".into()),
            ..Default::default()
        },
    );
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::RoleSelection);
    assert_eq!(client.resolver_state(), ResolverState::NeedsRoleSelection);
}

#[tokio::test]
async fn missing_record_and_unreachable_store_need_selection() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("ghost")));
    let client = client_with(&backend);
    assert_eq!(client.launch().await, Destination::RoleSelection);

    backend.inject(Op::GetDocument, Fault::Network);
    assert_eq!(client.refresh().await, Destination::RoleSelection);
    assert_eq!(client.banner(), None);
}

#[tokio::test]
async fn loosely_typed_record_still_resolves_by_role() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    let mut doc = Document::new();
    doc.insert("role".into(), Value::from("farmer"));
    doc.insert("totalSales".into(), Value::from(12.0));
    doc.insert("phoneNumber".into(), Value::from(712345678));
    backend.put_document("users", "U1", doc);
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::FarmerHome);
    assert_eq!(client.resolver_state(), ResolverState::ResolvedFarmer);
    assert_eq!(client.banner(), None);
}

#[tokio::test]
async fn unrecognised_role_needs_selection() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U3")));
    backend.put_user(
        "U3",
        &UserRecord {
            role: Some("admin".into()),
            ..Default::default()
        },
    );
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::RoleSelection);
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user("U1", &farmer("Amina"));
    let client = client_with(&backend);

    let first = client.refresh().await;
    let first_state = client.resolver_state();
    let second = client.refresh().await;

    assert_eq!(first, second);
    assert_eq!(first_state, client.resolver_state());
    assert_eq!(client.navigator().stack(), &[Destination::FarmerHome]);
}

// ============================================================================
// Role selection
// ============================================================================

#[tokio::test]
async fn role_selection_goes_home_without_second_read() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U2")));
    backend.put_user("U2", &UserRecord::default());
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::RoleSelection);
    assert_eq!(backend.reads_of("users", "U2"), 1);

    assert_eq!(
        client.select_role(Role::Customer).await.unwrap(),
        Destination::CustomerHome
    );
    assert_eq!(client.resolver_state(), ResolverState::ResolvedCustomer);
    assert_eq!(backend.reads_of("users", "U2"), 1);

    let record = backend.peek_document("users", "U2").unwrap();
    assert_eq!(record.get("role"), Some(&Value::from("customer")));
}

#[tokio::test]
async fn role_selection_write_failure_stays_put() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U2")));
    backend.put_user("U2", &UserRecord::default());
    let client = client_with(&backend);
    client.launch().await;

    backend.inject(Op::SetDocument, Fault::Network);
    let err = client.select_role(Role::Farmer).await.unwrap_err();
    assert!(matches!(err, AppError::Write(_)));
    assert_eq!(client.current_destination(), Destination::RoleSelection);
}

// ============================================================================
// Hard failures
// ============================================================================

#[tokio::test]
async fn permission_denied_fails_to_login_with_banner() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user("U1", &farmer("Amina"));
    backend.inject(Op::GetDocument, Fault::PermissionDenied);
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::Login);
    assert!(matches!(client.resolver_state(), ResolverState::Failed(_)));
    let banner = client.banner().expect("error banner");
    assert!(!banner.is_empty());
    assert_eq!(client.navigator().stack(), &[Destination::Login]);
}

#[tokio::test]
async fn corrupt_record_fails() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    let mut doc = agrisoko_core::Document::new();
    doc.insert("role".into(), Value::from(42));
    backend.put_document("users", "U1", doc);
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::Login);
    assert_eq!(
        client.banner().as_deref(),
        Some("Failed to retrieve user role.")
    );
}

#[tokio::test(start_paused = true)]
async fn slow_role_read_times_out() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user("U1", &farmer("Amina"));
    backend.set_read_delay(Some(Duration::from_secs(60)));
    let client = client_with(&backend);

    assert_eq!(client.launch().await, Destination::Login);
    assert!(matches!(client.resolver_state(), ResolverState::Failed(_)));
    assert!(client.banner().is_some());
}

// ============================================================================
// Stale resolutions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn superseded_resolution_never_navigates() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user("U1", &farmer("Amina"));
    backend.set_read_delay(Some(Duration::from_millis(500)));
    let client = client_with(&backend);
    let mut events = client.subscribe();

    let slow = client.refresh();
    let logout = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.logout().await
    };
    let (slow_result, logout_result) = futures::join!(slow, logout);

    assert_eq!(logout_result.unwrap(), Destination::Login);
    // The slow read finished after logout and was dropped.
    assert_eq!(slow_result, Destination::Login);
    assert_eq!(client.resolver_state(), ResolverState::Unauthenticated);
    assert_eq!(client.navigator().stack(), &[Destination::Login]);

    assert!(matches!(
        events.recv().await.unwrap(),
        AppEvent::Navigated {
            to: Destination::Login,
            ..
        }
    ));
    // The refresh held epoch 1; logout started epoch 2.
    assert_eq!(
        events.recv().await.unwrap(),
        AppEvent::ResolutionDiscarded { epoch: 1 }
    );
}

#[tokio::test(start_paused = true)]
async fn dashboard_load_overtaken_by_logout_never_navigates() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user("C1", &customer("Baraka"));
    backend.set_read_delay(Some(Duration::from_millis(500)));
    let client = client_with(&backend);

    let load = FarmerDashboard::load(&client);
    let logout = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.logout().await
    };
    let (loaded, logout_result) = futures::join!(load, logout);

    assert_eq!(logout_result.unwrap(), Destination::Login);
    assert!(matches!(loaded, Loaded::Discarded));
    assert!(client.current_session().is_none());
    assert_eq!(client.navigator().stack(), &[Destination::Login]);
    assert_eq!(client.resolver_state(), ResolverState::Unauthenticated);

    backend.set_session(Some(Session::new("C1")));
    let load = CustomerHome::load(&client);
    let logout = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.logout().await
    };
    let (loaded, logout_result) = futures::join!(load, logout);

    assert_eq!(logout_result.unwrap(), Destination::Login);
    assert!(matches!(loaded, Loaded::Discarded));
    assert_eq!(client.navigator().stack(), &[Destination::Login]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_dashboard_load_is_discarded() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user("C1", &customer("Baraka"));
    backend.set_read_delay(Some(Duration::from_millis(500)));
    let client = client_with(&backend);

    let load = FarmerDashboard::load(&client);
    let teardown = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.cancel_pending();
    };
    let (loaded, ()) = futures::join!(load, teardown);
    assert!(matches!(loaded, Loaded::Discarded));
    assert_eq!(client.current_destination(), Destination::Splash);

    let load = CustomerHome::load(&client);
    let teardown = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.cancel_pending();
    };
    let (loaded, ()) = futures::join!(load, teardown);
    assert!(matches!(loaded, Loaded::Discarded));
    assert_eq!(client.current_destination(), Destination::Splash);
    assert_eq!(client.resolver_state(), ResolverState::Loading);
}

#[tokio::test(start_paused = true)]
async fn cancelled_resolution_is_discarded() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user("U1", &farmer("Amina"));
    backend.set_read_delay(Some(Duration::from_millis(500)));
    let client = client_with(&backend);

    let resolve = client.refresh();
    let teardown = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.cancel_pending();
    };
    let (destination, ()) = futures::join!(resolve, teardown);

    assert_eq!(destination, Destination::Splash);
    assert_eq!(client.current_destination(), Destination::Splash);
    assert_eq!(client.resolver_state(), ResolverState::Loading);
}

// ============================================================================
// Auth flows
// ============================================================================

#[tokio::test]
async fn login_clears_the_stack() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account("amina@agri.co.ke", "secret1", "U1");
    backend.put_user("U1", &farmer("Amina"));
    let client = client_with(&backend);

    client.launch().await;
    client.open_register();
    client.open_login();
    assert_eq!(client.navigator().stack().len(), 3);

    assert_eq!(
        client.login("amina@agri.co.ke", "secret1").await.unwrap(),
        Destination::FarmerHome
    );
    assert_eq!(client.navigator().stack(), &[Destination::FarmerHome]);
    assert_eq!(client.back(), None);
}

#[tokio::test]
async fn failed_login_does_not_navigate() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account("amina@agri.co.ke", "secret1", "U1");
    let client = client_with(&backend);
    client.launch().await;
    let state_before = client.resolver_state();

    let err = client.login("amina@agri.co.ke", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    assert_eq!(client.current_destination(), Destination::Login);
    assert_eq!(client.resolver_state(), state_before);
    assert_eq!(backend.total_reads(), 0);
}

#[tokio::test]
async fn new_google_account_picks_a_role() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_credential("google-token", "G1");
    let client = client_with(&backend);
    client.launch().await;

    assert_eq!(
        client.sign_in_with_google("google-token").await.unwrap(),
        Destination::RoleSelection
    );
    assert_eq!(
        client.select_role(Role::Farmer).await.unwrap(),
        Destination::FarmerHome
    );

    client.logout().await.unwrap();
    assert_eq!(
        client.sign_in_with_google("google-token").await.unwrap(),
        Destination::FarmerHome
    );
}

#[tokio::test]
async fn logout_returns_to_login() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user("C1", &customer("Baraka"));
    let client = client_with(&backend);
    client.launch().await;

    assert_eq!(client.logout().await.unwrap(), Destination::Login);
    assert!(client.current_session().is_none());
    assert_eq!(client.refresh().await, Destination::Login);
}

#[tokio::test]
async fn failed_logout_keeps_the_session_screen() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user("C1", &customer("Baraka"));
    let client = client_with(&backend);
    client.launch().await;

    backend.inject(Op::SignOut, Fault::Network);
    assert!(client.logout().await.is_err());
    assert_eq!(client.current_destination(), Destination::CustomerHome);
}
