//! Farmer dashboard presenter.
//!
//! Loads the farmer's record, products and orders for the signed-in user.
//! Users who are not farmers are handed to the resolver, which picks their
//! real destination. Mutations only touch local state after the remote
//! write succeeded; failures are kept in [`FarmerDashboard::error`].

use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

use super::Loaded;
use crate::client::AgriClient;
use crate::error::AppResult;
use crate::navigator::Destination;
use crate::profile;
use crate::roles::lookup_from_read;
use crate::types::{
    DashboardStats, FarmerProfile, Order, OrderStatus, Product, Role, RoleLookup, UserId,
};

pub const DELETE_PRODUCT_FAILED: &str = "Failed to delete product.";
pub const UPDATE_ORDER_FAILED: &str = "Failed to update order.";
pub const UPLOAD_PICTURE_FAILED: &str = "Failed to upload profile picture.";
pub const LOGOUT_FAILED: &str = "Failed to log out.";

#[derive(Debug, Clone)]
pub struct FarmerDashboard {
    pub user_id: UserId,
    pub profile: FarmerProfile,
    pub products: Vec<Product>,
    pub orders: Vec<Order>,
    total_sales: i64,
    total_earnings: f64,
    error: Option<String>,
}

impl FarmerDashboard {
    /// Load the dashboard for the current session.
    ///
    /// The record and listing reads run under one resolution ticket, so a
    /// logout or cancel that lands mid-load leaves the navigator alone.
    pub async fn load(client: &AgriClient) -> Loaded<Self> {
        let Some(session) = client.current_session() else {
            return Loaded::Redirected(client.refresh().await);
        };
        let user_id = session.user_id;
        let ticket = client.begin_resolution();

        let record = match client.fetch_user_record(&user_id).await {
            Ok(Some(record)) if record.role_lookup() == RoleLookup::Assigned(Role::Farmer) => {
                record
            }
            other => {
                let read = other.map(|found| found.map(|record| record.role_lookup()));
                let lookup = lookup_from_read(&user_id, read);
                return match client.finish_resolution(ticket, lookup) {
                    Some(to) => Loaded::Redirected(to),
                    None => Loaded::Discarded,
                };
            }
        };

        let (products, orders) = match Self::load_listings(client, &user_id).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to load dashboard listings");
                return match client.finish_resolution(ticket, Err(e)) {
                    Some(to) => Loaded::Redirected(to),
                    None => Loaded::Discarded,
                };
            }
        };

        if client
            .finish_resolution(ticket, Ok(RoleLookup::Assigned(Role::Farmer)))
            .is_none()
        {
            info!(%user_id, "Dashboard load overtaken, dropping it");
            return Loaded::Discarded;
        }

        info!(
            %user_id,
            products = products.len(),
            orders = orders.len(),
            "Loaded farmer dashboard"
        );
        Loaded::Ready(Self {
            profile: FarmerProfile::from_record(&record),
            total_sales: record.total_sales.unwrap_or(0),
            total_earnings: record.total_earnings.unwrap_or(0.0),
            user_id,
            products,
            orders,
            error: None,
        })
    }

    async fn load_listings(
        client: &AgriClient,
        user_id: &UserId,
    ) -> AppResult<(Vec<Product>, Vec<Order>)> {
        let store = &client.collaborators().store;

        let products = store
            .list_documents(&user_id.products_collection())
            .await?
            .into_iter()
            .filter_map(|(id, doc)| match Product::from_document(&id, &doc) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(%user_id, product_id = %id, error = %e, "Skipping unreadable product");
                    None
                }
            })
            .collect();

        let orders = store
            .list_documents(&user_id.orders_collection())
            .await?
            .iter()
            .map(|(id, doc)| Order::from_document(id, doc))
            .collect();

        Ok((products, orders))
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            total_sales: self.total_sales,
            pending_orders: self.orders.iter().filter(|o| o.is_pending()).count(),
            total_earnings: self.total_earnings,
            active_listings: self.products.len(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Delete a product. Returns `true` when it was removed.
    pub async fn delete_product(&mut self, client: &AgriClient, product_id: &str) -> bool {
        let result = client
            .collaborators()
            .store
            .delete_document(&self.user_id.products_collection(), product_id)
            .await;

        match result {
            Ok(()) => {
                self.products.retain(|p| p.id != product_id);
                self.error = None;
                info!(user_id = %self.user_id, %product_id, "Deleted product");
                true
            }
            Err(e) => {
                warn!(user_id = %self.user_id, %product_id, error = %e, "Delete failed");
                self.error = Some(e.user_message(DELETE_PRODUCT_FAILED));
                false
            }
        }
    }

    /// Mark a pending order as delivered. Orders that are already delivered
    /// or unknown are left alone and return `false`.
    pub async fn mark_order_delivered(&mut self, client: &AgriClient, order_id: &str) -> bool {
        let Some(index) = self
            .orders
            .iter()
            .position(|o| o.id == order_id && o.is_pending())
        else {
            return false;
        };

        let result = client
            .collaborators()
            .store
            .update_field(
                &self.user_id.orders_collection(),
                order_id,
                "status",
                Value::from(OrderStatus::Delivered.as_str()),
            )
            .await;

        match result {
            Ok(()) => {
                self.orders[index].status = OrderStatus::Delivered;
                self.error = None;
                info!(user_id = %self.user_id, %order_id, "Order delivered");
                true
            }
            Err(e) => {
                warn!(user_id = %self.user_id, %order_id, error = %e, "Order update failed");
                self.error = Some(e.user_message(UPDATE_ORDER_FAILED));
                false
            }
        }
    }

    /// Upload a new profile picture and show it in the header.
    pub async fn upload_profile_picture(&mut self, client: &AgriClient, bytes: Bytes) -> bool {
        let collab = client.collaborators();
        let result = profile::upload_profile_picture(
            collab.blobs.as_ref(),
            collab.store.as_ref(),
            &self.user_id,
            bytes,
            client.config().max_profile_picture_bytes,
        )
        .await;

        match result {
            Ok(url) => {
                self.profile.profile_picture = Some(url);
                self.error = None;
                true
            }
            Err(e) => {
                self.error = Some(e.user_message(UPLOAD_PICTURE_FAILED));
                false
            }
        }
    }

    pub async fn logout(&mut self, client: &AgriClient) -> Option<Destination> {
        match client.logout().await {
            Ok(destination) => Some(destination),
            Err(e) => {
                self.error = Some(e.user_message(LOGOUT_FAILED));
                None
            }
        }
    }
}
