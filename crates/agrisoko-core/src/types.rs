//! Core types for the AgriSoko client

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::Document;
use crate::error::AppError;

/// Collection holding one record per account.
pub const USERS_COLLECTION: &str = "users";

/// Stable identifier the auth collaborator assigns to an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the `products` sub-collection for this user.
    pub fn products_collection(&self) -> String {
        format!("{}/{}/products", USERS_COLLECTION, self.0)
    }

    /// Path of the `orders` sub-collection for this user.
    pub fn orders_collection(&self) -> String {
        format!("{}/{}/orders", USERS_COLLECTION, self.0)
    }

    /// Blob path of this user's profile picture.
    pub fn profile_picture_path(&self) -> String {
        format!("{}/{}/profilePicture", USERS_COLLECTION, self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An authenticated session, as cached by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    /// Email the account signed in with, when the provider knows it
    pub email: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Marketplace role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Customer,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Farmer, Role::Customer];

    /// Wire value stored in the `role` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "customer" => Ok(Role::Customer),
            other => Err(AppError::Validation(format!(
                "unknown role '{}': expected farmer or customer",
                other
            ))),
        }
    }
}

/// Why a role lookup came back without an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    /// `users/{id}` does not exist
    Missing,
    /// The read failed transiently; carries the collaborator's message
    Unreachable(String),
}

/// Outcome of reading the `role` attribute of a user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleLookup {
    /// Field present with a recognised value
    Assigned(Role),
    /// Record exists but has no usable role
    Unassigned,
    /// Record missing or unreadable
    Unknown(UnknownReason),
}

/// Document stored at `users/{userId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Raw role string; see [`UserRecord::role_lookup`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sales: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_earnings: Option<f64>,
}

impl UserRecord {
    /// Record written at registration time.
    pub fn registered(
        email: impl Into<String>,
        name: impl Into<String>,
        phone_number: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            email: Some(email.into()),
            role: Some(role.as_str().to_string()),
            name: Some(name.into()),
            phone_number: Some(phone_number.into()),
            ..Default::default()
        }
    }

    /// Interpret the `role` field. Unrecognised values count as unassigned.
    pub fn role_lookup(&self) -> RoleLookup {
        lookup_role_value(self.role.as_deref())
    }

    /// Read a stored record.
    ///
    /// Only a non-string `role` makes the record unreadable. The other
    /// fields are display data: numbers stored where text is expected are
    /// shown as text, and `totalSales` accepts floats as well as integers.
    pub fn from_document(doc: &Document) -> Result<Self, AppError> {
        Ok(Self {
            email: text_field(doc, "email"),
            role: role_field(doc)?,
            name: text_field(doc, "name"),
            phone_number: text_field(doc, "phoneNumber"),
            profile_picture: text_field(doc, "profilePicture"),
            total_sales: doc
                .get("totalSales")
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))),
            total_earnings: doc.get("totalEarnings").and_then(Value::as_f64),
        })
    }

    pub fn to_document(&self) -> Result<Document, AppError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(AppError::Serialization("user record is not an object".into())),
        }
    }
}

/// Role lookup that looks at the `role` attribute and nothing else.
pub fn role_lookup_from_document(doc: &Document) -> Result<RoleLookup, AppError> {
    Ok(lookup_role_value(role_field(doc)?.as_deref()))
}

fn lookup_role_value(raw: Option<&str>) -> RoleLookup {
    match raw.map(Role::from_str) {
        Some(Ok(role)) => RoleLookup::Assigned(role),
        _ => RoleLookup::Unassigned,
    }
}

fn role_field(doc: &Document) -> Result<Option<String>, AppError> {
    match doc.get("role") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(role)) => Ok(Some(role.clone())),
        Some(other) => Err(AppError::InvalidRecord(format!(
            "user record: role is not a string: {}",
            other
        ))),
    }
}

fn text_field(doc: &Document, key: &str) -> Option<String> {
    match doc.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A product listed by a farmer (`users/{uid}/products/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip)]
    pub id: String,
    #[serde(default = "unnamed")]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: u32,
}

fn unnamed() -> String {
    "Unnamed".to_string()
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            price,
            quantity,
        }
    }

    pub fn from_document(id: &str, doc: &Document) -> Result<Self, AppError> {
        let mut product: Product = serde_json::from_value(serde_json::Value::Object(doc.clone()))
            .map_err(|e| AppError::InvalidRecord(format!("product {}: {}", id, e)))?;
        product.id = id.to_string();
        Ok(product)
    }

    pub fn to_document(&self) -> Result<Document, AppError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(AppError::Serialization("product is not an object".into())),
        }
    }
}

/// Delivery state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Anything other than "Delivered" is treated as pending.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s {
            Some("Delivered") => OrderStatus::Delivered,
            _ => OrderStatus::Pending,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order placed with a farmer (`users/{uid}/orders/{id}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(customer_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            customer_name: customer_name.into(),
            status: OrderStatus::Pending,
        }
    }

    pub fn from_document(id: &str, doc: &Document) -> Self {
        let customer_name = doc
            .get("customerName")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();
        let status = OrderStatus::parse_lenient(doc.get("status").and_then(|v| v.as_str()));
        Self {
            id: id.to_string(),
            customer_name,
            status,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("customerName".into(), self.customer_name.clone().into());
        doc.insert("status".into(), self.status.as_str().into());
        doc
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// Header information on the farmer dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmerProfile {
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

impl FarmerProfile {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            name: record.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            email: record.email.clone().unwrap_or_else(|| "No Email".to_string()),
            profile_picture: record.profile_picture.clone(),
        }
    }
}

/// Aggregates shown on the farmer dashboard overview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_sales: i64,
    pub pending_orders: usize,
    pub total_earnings: f64,
    pub active_listings: usize,
}
