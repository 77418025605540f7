//! Order management for customers, admins and suppliers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use super::{require_admin, Shop};
use crate::auth::Identity;
use crate::domain::aggregates::{Order, OrderStatus, PaymentStatus, Role, Supplier, SupplierSignup};
use crate::notifications::NotificationKind;
use crate::pricing::PricingConfig;
use crate::store::OrderFilter;
use crate::{Result, ShopError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_orders: usize,
    pub pending_orders: usize,
    /// Paid revenue keyed by currency code.
    pub total_revenue: BTreeMap<String, Decimal>,
}

impl AdminStats {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut stats = Self { total_orders: orders.len(), ..Default::default() };
        for order in orders {
            if order.status == OrderStatus::Pending {
                stats.pending_orders += 1;
            }
            if order.payment_status == PaymentStatus::Paid {
                *stats.total_revenue.entry(order.currency.code().to_string()).or_default() += order.total_price;
            }
        }
        stats
    }
}

impl Shop {
    /// Admins may make any legal transition. Suppliers may only move their own
    /// assigned orders to processing or completed.
    pub async fn update_order_status(&self, identity: &Identity, update: StatusUpdate) -> Result<Order> {
        let next: OrderStatus = update.status.parse().map_err(|_| ShopError::Validation("Invalid status".into()))?;
        let mut order = self.store.get_order(update.order_id).await?.ok_or(ShopError::NotFound("Order"))?;

        if !identity.is_admin() {
            if !identity.has_role(Role::Supplier) {
                return Err(ShopError::Forbidden("Unauthorized. Admin access required.".into()));
            }
            let supplier = self.store.supplier_for_owner(identity.user_id).await?
                .ok_or_else(|| ShopError::Forbidden("Supplier profile not found".into()))?;
            if order.supplier_id != Some(supplier.id) {
                return Err(ShopError::Forbidden("Order is not assigned to this supplier".into()));
            }
            if !matches!(next, OrderStatus::Processing | OrderStatus::Completed) {
                return Err(ShopError::Forbidden("Suppliers may only mark orders processing or completed".into()));
            }
            if update.admin_notes.is_some() {
                return Err(ShopError::Forbidden("Only admins can add notes".into()));
            }
        }

        let previous = order.status;
        let changed = order.transition_to(next)?;
        if let Some(notes) = update.admin_notes.filter(|n| !n.trim().is_empty()) {
            order.annotate(notes);
        }
        self.store.save_order(&order).await?;
        if changed {
            tracing::info!(order_id = %order.id, from = %previous, to = %next, by = %identity.user_id, "order status updated");
        }
        self.publish(order.take_events()).await;

        if changed && next == OrderStatus::Approved {
            self.notifier.dispatch(NotificationKind::Confirmation, order.id).await;
        }
        if changed && next == OrderStatus::Processing && order.supplier_id.is_some() {
            self.notifier.dispatch(NotificationKind::SupplierAlert, order.id).await;
        }
        Ok(order)
    }

    pub async fn my_orders(&self, identity: &Identity) -> Result<Vec<Order>> {
        Ok(self.store.list_orders(OrderFilter::Owner(identity.user_id)).await?)
    }

    /// Visible to its owner, admins and the assigned supplier.
    pub async fn order_for(&self, identity: &Identity, order_id: Uuid) -> Result<Order> {
        let order = self.store.get_order(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        if order.owner == identity.user_id || identity.is_admin() {
            return Ok(order);
        }
        if identity.has_role(Role::Supplier) {
            if let (Some(supplier), Some(assigned)) = (self.store.supplier_for_owner(identity.user_id).await?, order.supplier_id) {
                if supplier.id == assigned {
                    return Ok(order);
                }
            }
        }
        Err(ShopError::NotFound("Order"))
    }

    pub async fn admin_orders(&self, identity: &Identity) -> Result<Vec<Order>> {
        require_admin(identity)?;
        Ok(self.store.list_orders(OrderFilter::All).await?)
    }

    pub async fn admin_stats(&self, identity: &Identity) -> Result<AdminStats> {
        require_admin(identity)?;
        let orders = self.store.list_orders(OrderFilter::All).await?;
        Ok(AdminStats::from_orders(&orders))
    }

    pub async fn update_pricing(&self, identity: &Identity, config: PricingConfig) -> Result<PricingConfig> {
        require_admin(identity)?;
        config.validate()?;
        self.store.upsert_pricing_config(&config).await?;
        tracing::info!(wristband_type = %config.wristband_type, currency = %config.currency, "pricing updated");
        Ok(config)
    }

    pub async fn supplier_orders(&self, identity: &Identity) -> Result<Vec<Order>> {
        let supplier = self.store.supplier_for_owner(identity.user_id).await?.ok_or(ShopError::NotFound("Supplier"))?;
        Ok(self.store.list_orders(OrderFilter::Supplier(supplier.id)).await?)
    }

    pub async fn register_supplier(&self, identity: &Identity, signup: SupplierSignup) -> Result<Supplier> {
        signup.validate()?;
        if self.store.supplier_for_owner(identity.user_id).await?.is_some() {
            return Err(ShopError::Conflict("Supplier profile already exists".into()));
        }
        let supplier = Supplier::register(identity.user_id, signup);
        self.store.insert_supplier(&supplier).await?;
        self.store.grant_role(identity.user_id, Role::Supplier).await?;
        tracing::info!(supplier_id = %supplier.id, company = %supplier.company_name, "supplier registered");
        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        Ok(self.store.list_suppliers().await?)
    }

    /// Explicit resend of an order email. Unlike automatic dispatch, delivery
    /// failures reach the caller.
    pub async fn send_notification(&self, identity: &Identity, kind: NotificationKind, order_id: Uuid) -> Result<()> {
        let order = self.store.get_order(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        if order.owner != identity.user_id && !identity.is_admin() {
            return Err(ShopError::Forbidden("Unauthorized".into()));
        }
        self.notifier.send(kind, order_id).await
    }

    pub async fn send_verification_email(&self, identity: &Identity, confirmation_url: &str) -> Result<()> {
        if confirmation_url.trim().is_empty() {
            return Err(ShopError::Validation("Missing required fields".into()));
        }
        let profile = self.store.get_profile(identity.user_id).await?.ok_or(ShopError::NotFound("User email"))?;
        self.notifier.send_verification(&profile.email, profile.full_name.as_deref(), confirmation_url).await
    }
}
