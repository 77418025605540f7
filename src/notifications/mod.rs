//! Templated order emails.
//!
//! [`Notifier::send`] is used by the explicit `send-*` endpoints and returns
//! failures to the caller. [`Notifier::dispatch`] is used after state transitions
//! and only logs failures, so a payment or status update never fails because an
//! email could not be delivered.

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::EmailSettings;
use crate::domain::aggregates::{Design, Order, Profile, Supplier};
use crate::store::Store;
use crate::{Result, ShopError};

pub mod resend;
pub mod templates;

pub use resend::{LogMailer, ResendClient};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> std::result::Result<(), MailError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Confirmation,
    AdminAlert,
    SupplierAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmation => "order confirmation",
            Self::AdminAlert => "admin notification",
            Self::SupplierAlert => "supplier notification",
        }
    }
}

/// An order joined with everything its emails mention.
#[derive(Clone, Debug)]
pub struct OrderDetails {
    pub order: Order,
    pub profile: Option<Profile>,
    pub design: Option<Design>,
    pub supplier: Option<Supplier>,
}

impl OrderDetails {
    pub fn customer_name(&self) -> &str {
        self.profile.as_ref().map(Profile::display_name).unwrap_or("Customer")
    }
}

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    settings: EmailSettings,
}

impl Notifier {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, settings: EmailSettings) -> Self {
        Self { store, mailer, settings }
    }

    pub async fn load(&self, order_id: Uuid) -> Result<OrderDetails> {
        let order = self.store.get_order(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        let profile = self.store.get_profile(order.owner).await?;
        let design = match order.design_id {
            Some(id) => self.store.get_design(id).await?,
            None => None,
        };
        let supplier = match order.supplier_id {
            Some(id) => self.store.get_supplier(id).await?,
            None => None,
        };
        Ok(OrderDetails { order, profile, design, supplier })
    }

    fn render(&self, kind: NotificationKind, details: &OrderDetails) -> Result<Email> {
        let today = chrono::Utc::now().date_naive();
        let (to, subject, html) = match kind {
            NotificationKind::Confirmation => {
                let to = details.profile.as_ref().map(|p| p.email.clone()).filter(|e| !e.is_empty())
                    .ok_or(ShopError::NotFound("User email"))?;
                let (subject, html) = templates::confirmation(details, today);
                (to, subject, html)
            }
            NotificationKind::AdminAlert => {
                let (subject, html) = templates::admin_alert(details, &self.settings.admin_dashboard_url);
                (self.settings.admin_email.clone(), subject, html)
            }
            NotificationKind::SupplierAlert => {
                let to = details.supplier.as_ref().map(|s| s.contact_email.clone()).filter(|e| !e.is_empty())
                    .ok_or(ShopError::NotFound("Supplier email"))?;
                let (subject, html) = templates::supplier_alert(details);
                (to, subject, html)
            }
        };
        Ok(Email { from: self.settings.from.clone(), to: vec![to], subject, html })
    }

    /// Renders and sends one email, returning any failure.
    pub async fn send(&self, kind: NotificationKind, order_id: Uuid) -> Result<()> {
        let details = self.load(order_id).await?;
        let email = self.render(kind, &details)?;
        self.mailer.send(email).await?;
        tracing::info!(%order_id, kind = kind.as_str(), "notification sent");
        Ok(())
    }

    /// Like [`Notifier::send`] but failures are logged and swallowed.
    pub async fn dispatch(&self, kind: NotificationKind, order_id: Uuid) {
        if let Err(e) = self.send(kind, order_id).await {
            tracing::warn!(%order_id, kind = kind.as_str(), error = %e, "notification failed");
        }
    }

    pub async fn send_verification(&self, email: &str, full_name: Option<&str>, confirmation_url: &str) -> Result<()> {
        let (subject, html) = templates::verification(full_name, confirmation_url);
        self.mailer.send(Email { from: self.settings.from.clone(), to: vec![email.to_string()], subject, html }).await?;
        tracing::info!(%email, "verification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::aggregates::{OrderOptions, Role};
    use crate::domain::value_objects::{Currency, WristbandType};
    use crate::pricing::{quote, PricingConfig, QuoteRequest};
    use crate::store::MemoryStore;

    async fn seeded(store: &MemoryStore, email: &str) -> Order {
        let owner = Uuid::now_v7();
        store.upsert_profile(&Profile { id: owner, email: email.into(), full_name: Some("Ada".into()) }).await.unwrap();
        store.grant_role(owner, Role::User).await.unwrap();
        let request = QuoteRequest { wristband_type: WristbandType::Tyvek, quantity: 1500, currency: Currency::Eur, print_type: Default::default(), has_trademark: false, has_qr_code: false };
        let q = quote(&PricingConfig::standard(WristbandType::Tyvek, Currency::Eur), &request).unwrap();
        let order = Order::place(owner, None, None, &q, OrderOptions::default());
        store.insert_order(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_confirmation_goes_to_owner() {
        let store = Arc::new(MemoryStore::new());
        let order = seeded(&store, "ada@example.com").await;
        let mut mailer = MockMailer::new();
        mailer.expect_send()
            .withf(|e| e.to == vec!["ada@example.com".to_string()] && e.subject == "Order Confirmed - 1500 Custom Wristbands")
            .times(1)
            .returning(|_| Ok(()));
        let notifier = Notifier::new(store, Arc::new(mailer), Settings::default().email);
        notifier.send(NotificationKind::Confirmation, order.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_supplier_alert_requires_supplier() {
        let store = Arc::new(MemoryStore::new());
        let order = seeded(&store, "ada@example.com").await;
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(0);
        let notifier = Notifier::new(store, Arc::new(mailer), Settings::default().email);
        let err = notifier.send(NotificationKind::SupplierAlert, order.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Supplier email not found");
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let store = Arc::new(MemoryStore::new());
        let order = seeded(&store, "ada@example.com").await;
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_| Err(MailError::Api { status: 500, message: "down".into() }));
        let notifier = Notifier::new(store, Arc::new(mailer), Settings::default().email);
        notifier.dispatch(NotificationKind::AdminAlert, order.id).await;
    }
}
