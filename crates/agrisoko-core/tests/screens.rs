//! Screen presenter tests: forms, dashboards and their failure paths.

use std::sync::Arc;

use agrisoko_core::screens::{
    CustomerHome, FarmerDashboard, Loaded, LoginScreen, RegisterScreen, RoleSelectionScreen,
};
use agrisoko_core::error::GENERIC_READ_FAILURE;
use agrisoko_core::{
    AgriClient, ClientConfig, Collaborators, Destination, Document, Fault, MemoryBackend, Op,
    Order, OrderStatus, Product, Registration, Role, Session, UserId, UserRecord,
};
use bytes::Bytes;
use serde_json::{json, Value};

fn client_with(backend: &Arc<MemoryBackend>) -> AgriClient {
    let config = ClientConfig {
        splash_delay_ms: 0,
        max_profile_picture_bytes: 1024,
        ..Default::default()
    };
    AgriClient::new(Collaborators::from_backend(backend.clone()), config)
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

/// Farmer U1 with two products, one pending and one delivered order.
fn seeded_farmer() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    let user_id = UserId::new("U1");
    backend.put_user(
        "U1",
        &UserRecord {
            total_sales: Some(12),
            total_earnings: Some(5400.5),
            ..UserRecord::registered("amina@agri.co.ke", "Amina", "0712345678", Role::Farmer)
        },
    );

    let products = user_id.products_collection();
    backend.put_document(&products, "p1", Product::new("Maize", 45.0, 100).to_document().unwrap());
    backend.put_document(&products, "p2", Product::new("Beans", 120.0, 30).to_document().unwrap());

    let orders = user_id.orders_collection();
    backend.put_document(&orders, "o1", Order::new("Baraka").to_document());
    backend.put_document(
        &orders,
        "o2",
        doc(json!({ "customerName": "Wanjiru", "status": "Delivered" })),
    );
    backend
}

async fn load_dashboard(client: &AgriClient) -> FarmerDashboard {
    match FarmerDashboard::load(client).await {
        Loaded::Ready(dashboard) => dashboard,
        Loaded::Redirected(to) => panic!("redirected to {}", to),
        Loaded::Discarded => panic!("dashboard load was discarded"),
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_screen_rejects_empty_fields_locally() {
    let backend = Arc::new(MemoryBackend::new());
    let client = client_with(&backend);
    let mut screen = LoginScreen::new();

    assert!(!screen.can_submit());
    assert_eq!(screen.submit(&client).await, None);
    assert_eq!(screen.error(), Some("Please enter your email and password."));
}

#[tokio::test]
async fn login_screen_shows_auth_message() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account("amina@agri.co.ke", "secret1", "U1");
    let client = client_with(&backend);
    client.launch().await;

    let mut screen = LoginScreen::new();
    screen.email = "amina@agri.co.ke".into();
    screen.password = "nope".into();
    assert_eq!(screen.submit(&client).await, None);
    assert_eq!(
        screen.error(),
        Some("The password is invalid or the user does not exist.")
    );

    backend.inject(Op::SignIn, Fault::Auth(None));
    screen.submit(&client).await;
    assert_eq!(screen.error(), Some("Authentication failed."));
    assert_eq!(client.current_destination(), Destination::Login);
}

#[tokio::test]
async fn login_screen_surfaces_role_read_failure() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account("amina@agri.co.ke", "secret1", "U1");
    let mut corrupt = Document::new();
    corrupt.insert("role".into(), json!(["farmer"]));
    backend.put_document("users", "U1", corrupt);
    let client = client_with(&backend);
    client.launch().await;

    let mut screen = LoginScreen::new();
    screen.email = "amina@agri.co.ke".into();
    screen.password = "secret1".into();
    assert_eq!(screen.submit(&client).await, Some(Destination::Login));
    assert_eq!(screen.error(), Some("Failed to retrieve user role."));
}

#[tokio::test]
async fn google_sign_in_without_token_fails() {
    let backend = Arc::new(MemoryBackend::new());
    let client = client_with(&backend);
    let mut screen = LoginScreen::new();

    assert_eq!(screen.sign_in_with_google(&client, None).await, None);
    assert_eq!(screen.error(), Some("Google Sign-In Failed"));

    backend.inject(Op::SignInWithCredential, Fault::Auth(None));
    assert_eq!(screen.sign_in_with_google(&client, Some("tok")).await, None);
    assert_eq!(screen.error(), Some("Google Sign-In Failed"));
}

// ============================================================================
// Register
// ============================================================================

fn filled_form(role: Option<Role>) -> Registration {
    Registration {
        name: "Amina Njeri".into(),
        phone_number: "0712345678".into(),
        email: "amina@agri.co.ke".into(),
        password: "secret1".into(),
        role,
    }
}

#[tokio::test]
async fn register_screen_creates_record_and_goes_home() {
    let backend = Arc::new(MemoryBackend::new());
    let client = client_with(&backend);
    client.launch().await;
    client.open_register();

    let mut screen = RegisterScreen::new();
    screen.form = filled_form(None);
    screen.select_role(Role::Farmer);
    assert_eq!(screen.submit(&client).await, Some(Destination::FarmerHome));

    let session = client.current_session().unwrap();
    let record = backend
        .peek_document("users", session.user_id.as_str())
        .unwrap();
    assert_eq!(record.get("role"), Some(&Value::from("farmer")));
    assert_eq!(record.get("phoneNumber"), Some(&Value::from("0712345678")));
    assert_eq!(client.navigator().stack(), &[Destination::FarmerHome]);
}

#[tokio::test]
async fn register_screen_validates_before_calling_out() {
    let backend = Arc::new(MemoryBackend::new());
    let client = client_with(&backend);
    let mut screen = RegisterScreen::new();
    screen.form = Registration {
        password: "123".into(),
        ..filled_form(Some(Role::Customer))
    };

    assert!(!screen.can_submit());
    assert_eq!(screen.submit(&client).await, None);
    assert_eq!(
        screen.field_errors().password,
        Some("Password should be at least 6 characters")
    );
    assert!(client.current_session().is_none());
}

#[tokio::test]
async fn register_screen_requires_role() {
    let backend = Arc::new(MemoryBackend::new());
    let client = client_with(&backend);
    let mut screen = RegisterScreen::new();
    screen.form = filled_form(None);

    assert_eq!(screen.submit(&client).await, None);
    assert_eq!(screen.error(), Some("Please select a role."));
}

#[tokio::test]
async fn register_screen_record_write_failure() {
    let backend = Arc::new(MemoryBackend::new());
    backend.inject(Op::SetDocument, Fault::Network);
    let client = client_with(&backend);
    let mut screen = RegisterScreen::new();
    screen.form = filled_form(Some(Role::Farmer));

    assert_eq!(screen.submit(&client).await, None);
    assert_eq!(
        screen.error(),
        Some("Failed to save user details. Please try again")
    );
}

#[tokio::test]
async fn register_screen_account_failure() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account("amina@agri.co.ke", "other1", "U9");
    let client = client_with(&backend);
    let mut screen = RegisterScreen::new();
    screen.form = filled_form(Some(Role::Farmer));

    assert_eq!(screen.submit(&client).await, None);
    assert_eq!(
        screen.error(),
        Some("The email address is already in use by another account.")
    );

    backend.inject(Op::CreateAccount, Fault::Auth(None));
    screen.submit(&client).await;
    assert_eq!(screen.error(), Some("Registration failed."));
}

// ============================================================================
// Role selection
// ============================================================================

#[tokio::test]
async fn role_selection_screen() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("G1")));
    let client = client_with(&backend);
    assert_eq!(client.launch().await, Destination::RoleSelection);

    let mut screen = RoleSelectionScreen::new();
    assert_eq!(screen.confirm(&client).await, None);

    screen.select(Role::Customer);
    backend.inject(Op::SetDocument, Fault::Write(String::new()));
    assert_eq!(screen.confirm(&client).await, None);
    assert_eq!(screen.error(), Some("Failed to save role."));

    backend.clear_fault(Op::SetDocument);
    assert_eq!(
        screen.confirm(&client).await,
        Some(Destination::CustomerHome)
    );
}

// ============================================================================
// Farmer dashboard
// ============================================================================

#[tokio::test]
async fn dashboard_loads_profile_listings_and_stats() {
    let backend = seeded_farmer();
    let client = client_with(&backend);
    let dashboard = load_dashboard(&client).await;

    assert_eq!(dashboard.profile.name, "Amina");
    assert_eq!(dashboard.profile.email, "amina@agri.co.ke");
    assert_eq!(dashboard.products.len(), 2);
    assert_eq!(dashboard.orders.len(), 2);

    let stats = dashboard.stats();
    assert_eq!(stats.total_sales, 12);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.total_earnings, 5400.5);
    assert_eq!(stats.active_listings, 2);
}

#[tokio::test]
async fn dashboard_reads_loosely_typed_aggregates() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_document(
        "users",
        "U1",
        doc(json!({
            "role": "farmer",
            "name": "Amina",
            "totalSales": 12.0,
            "totalEarnings": 5400,
            "phoneNumber": 712345678
        })),
    );
    let client = client_with(&backend);
    let dashboard = load_dashboard(&client).await;

    assert_eq!(dashboard.profile.name, "Amina");
    assert_eq!(dashboard.stats().total_sales, 12);
    assert_eq!(dashboard.stats().total_earnings, 5400.0);
    assert_eq!(client.current_destination(), Destination::FarmerHome);
}

#[tokio::test]
async fn dashboard_defaults_for_sparse_record() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("U1")));
    backend.put_user(
        "U1",
        &UserRecord {
            role: Some("farmer".into()),
            ..Default::default()
        },
    );
    backend.put_document(
        "users/U1/products",
        "bad",
        doc(json!({ "name": "Broken", "price": "free" })),
    );
    let client = client_with(&backend);
    let dashboard = load_dashboard(&client).await;

    assert_eq!(dashboard.profile.name, "Unknown");
    assert_eq!(dashboard.profile.email, "No Email");
    assert!(dashboard.products.is_empty());
    assert_eq!(dashboard.stats().total_sales, 0);
    assert_eq!(dashboard.stats().total_earnings, 0.0);
}

#[tokio::test]
async fn dashboard_redirects_non_farmers() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user(
        "C1",
        &UserRecord::registered("b@agri.co.ke", "Baraka", "0798765432", Role::Customer),
    );
    let client = client_with(&backend);
    assert!(matches!(
        FarmerDashboard::load(&client).await,
        Loaded::Redirected(Destination::CustomerHome)
    ));

    backend.set_session(Some(Session::new("nobody")));
    assert!(matches!(
        FarmerDashboard::load(&client).await,
        Loaded::Redirected(Destination::RoleSelection)
    ));

    backend.set_session(None);
    assert!(matches!(
        FarmerDashboard::load(&client).await,
        Loaded::Redirected(Destination::Login)
    ));
}

#[tokio::test]
async fn dashboard_listing_failure_goes_to_login() {
    let backend = seeded_farmer();
    backend.inject(Op::ListDocuments, Fault::PermissionDenied);
    let client = client_with(&backend);

    assert!(matches!(
        FarmerDashboard::load(&client).await,
        Loaded::Redirected(Destination::Login)
    ));
    assert!(client.banner().is_some());
}

#[tokio::test]
async fn delete_product_updates_only_on_success() {
    let backend = seeded_farmer();
    let client = client_with(&backend);
    let mut dashboard = load_dashboard(&client).await;

    backend.inject(Op::DeleteDocument, Fault::Write(String::new()));
    assert!(!dashboard.delete_product(&client, "p1").await);
    assert_eq!(dashboard.products.len(), 2);
    assert_eq!(dashboard.error(), Some("Failed to delete product."));

    backend.inject(Op::DeleteDocument, Fault::Write("Listing has open orders".into()));
    assert!(!dashboard.delete_product(&client, "p1").await);
    assert_eq!(dashboard.error(), Some("Listing has open orders"));

    backend.inject(Op::DeleteDocument, Fault::Network);
    assert!(!dashboard.delete_product(&client, "p1").await);
    assert_eq!(dashboard.error(), Some(GENERIC_READ_FAILURE));
    assert_eq!(dashboard.products.len(), 2);

    backend.clear_fault(Op::DeleteDocument);
    assert!(dashboard.delete_product(&client, "p1").await);
    assert_eq!(dashboard.products.len(), 1);
    assert_eq!(dashboard.error(), None);
    assert!(backend.peek_document("users/U1/products", "p1").is_none());
}

#[tokio::test]
async fn mark_order_delivered_only_for_pending() {
    let backend = seeded_farmer();
    let client = client_with(&backend);
    let mut dashboard = load_dashboard(&client).await;

    assert!(!dashboard.mark_order_delivered(&client, "o2").await);
    assert!(!dashboard.mark_order_delivered(&client, "missing").await);

    assert!(dashboard.mark_order_delivered(&client, "o1").await);
    assert_eq!(dashboard.stats().pending_orders, 0);
    let stored = backend.peek_document("users/U1/orders", "o1").unwrap();
    assert_eq!(stored.get("status"), Some(&Value::from("Delivered")));

    assert!(!dashboard.mark_order_delivered(&client, "o1").await);
}

#[tokio::test]
async fn mark_order_delivered_failure_keeps_state() {
    let backend = seeded_farmer();
    let client = client_with(&backend);
    let mut dashboard = load_dashboard(&client).await;

    backend.inject(Op::UpdateField, Fault::Write("Order locked".into()));
    assert!(!dashboard.mark_order_delivered(&client, "o1").await);
    assert_eq!(dashboard.orders.iter().filter(|o| o.is_pending()).count(), 1);
    assert_eq!(dashboard.error(), Some("Order locked"));
    let stored = backend.peek_document("users/U1/orders", "o1").unwrap();
    assert_eq!(stored.get("status"), Some(&Value::from(OrderStatus::Pending.as_str())));
}

#[tokio::test]
async fn upload_profile_picture_from_dashboard() {
    let backend = seeded_farmer();
    let client = client_with(&backend);
    let mut dashboard = load_dashboard(&client).await;

    assert!(!dashboard
        .upload_profile_picture(&client, Bytes::from(vec![0u8; 2048]))
        .await);
    assert!(dashboard.profile.profile_picture.is_none());
    assert!(backend.blob("users/U1/profilePicture").is_none());

    assert!(dashboard
        .upload_profile_picture(&client, Bytes::from_static(b"\x89PNG"))
        .await);
    assert_eq!(
        dashboard.profile.profile_picture.as_deref(),
        Some("memory://users/U1/profilePicture")
    );
    let record = backend.peek_document("users", "U1").unwrap();
    assert_eq!(
        record.get("profilePicture"),
        Some(&Value::from("memory://users/U1/profilePicture"))
    );
}

#[tokio::test]
async fn dashboard_logout() {
    let backend = seeded_farmer();
    let client = client_with(&backend);
    let mut dashboard = load_dashboard(&client).await;

    assert_eq!(dashboard.logout(&client).await, Some(Destination::Login));
    assert!(client.current_session().is_none());
}

// ============================================================================
// Customer home
// ============================================================================

#[tokio::test]
async fn customer_home_greets_by_name() {
    let backend = Arc::new(MemoryBackend::with_session(Session::new("C1")));
    backend.put_user(
        "C1",
        &UserRecord::registered("b@agri.co.ke", "Baraka", "0798765432", Role::Customer),
    );
    let client = client_with(&backend);

    let home = CustomerHome::load(&client).await.ready().unwrap();
    assert_eq!(home.greeting(), "Welcome, Baraka");
}

#[tokio::test]
async fn customer_home_redirects_farmers() {
    let backend = seeded_farmer();
    let client = client_with(&backend);

    assert!(matches!(
        CustomerHome::load(&client).await,
        Loaded::Redirected(Destination::FarmerHome)
    ));
}
