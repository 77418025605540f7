//! Payment status reconciliation.
//!
//! The provider is the source of truth. Every write is a compare-and-set on the
//! payment status the order had when it was read, so concurrent or repeated
//! reconciliations of one session converge and only the winning write sends the
//! customer confirmation and the admin alert.

use serde::Serialize;
use uuid::Uuid;

use super::Shop;
use crate::domain::aggregates::{Order, OrderStatus, PaymentStatus};
use crate::notifications::NotificationKind;
use crate::payments::webhook::WebhookEvent;
use crate::payments::{verify_webhook_signature, PaymentError, SessionStatus};
use crate::{Result, ShopError};

const HANDLED_EVENTS: [&str; 4] = [
    "checkout.session.completed",
    "checkout.session.expired",
    "checkout.session.async_payment_succeeded",
    "checkout.session.async_payment_failed",
];

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledOrder {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Whether this call performed the update.
    pub updated: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub session_id: String,
    pub payment_status: PaymentStatus,
    pub orders: Vec<ReconciledOrder>,
}

fn unchanged(order: &Order) -> ReconciledOrder {
    ReconciledOrder { order_id: order.id, status: order.status, payment_status: order.payment_status, updated: false }
}

impl Shop {
    /// Reconciles a session after the customer returns from the payment page.
    pub async fn update_payment_status(&self, session_id: &str) -> Result<ReconcileOutcome> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ShopError::Validation("Session ID is required".into()));
        }
        if !is_session_id(session_id) {
            return Err(ShopError::Validation("Invalid session ID".into()));
        }
        let session = self.payments.retrieve_session(session_id).await?;
        self.reconcile_session(&session).await
    }

    async fn session_orders(&self, session: &SessionStatus) -> Result<Vec<Order>> {
        let orders = self.store.orders_for_session(&session.id).await?;
        if !orders.is_empty() {
            return Ok(orders);
        }
        // The session reference may never have been persisted.
        let ids = session.order_ids();
        if ids.is_empty() {
            return Err(ShopError::NotFound("Order"));
        }
        // Orders since moved to another session belong to that session.
        let orders: Vec<Order> = self.store.get_orders(&ids).await?
            .into_iter()
            .filter(|o| o.checkout_session_id.as_deref().map_or(true, |id| id == session.id))
            .collect();
        if orders.is_empty() {
            return Err(ShopError::NotFound("Order"));
        }
        Ok(orders)
    }

    pub async fn reconcile_session(&self, session: &SessionStatus) -> Result<ReconcileOutcome> {
        let verdict = session.verdict();
        let orders = self.session_orders(session).await?;

        let mut outcome = ReconcileOutcome { session_id: session.id.clone(), payment_status: verdict, orders: Vec::with_capacity(orders.len()) };
        for order in orders {
            let expected = order.payment_status;
            let mut next = order.clone();
            if next.checkout_session_id.is_none() {
                next.checkout_session_id = Some(session.id.clone());
            }
            if !next.apply_payment(verdict, session.payment_intent.clone()) {
                outcome.orders.push(unchanged(&order));
                continue;
            }

            if !self.store.compare_and_set_payment(&next, expected).await? {
                tracing::info!(order_id = %order.id, "payment already reconciled by a concurrent call");
                let current = self.store.get_order(order.id).await?.unwrap_or(order);
                outcome.orders.push(unchanged(&current));
                continue;
            }

            tracing::info!(order_id = %next.id, payment_status = %next.payment_status, status = %next.status, "payment status updated");
            self.publish(next.take_events()).await;
            if next.payment_status == PaymentStatus::Paid {
                self.notifier.dispatch(NotificationKind::Confirmation, next.id).await;
                self.notifier.dispatch(NotificationKind::AdminAlert, next.id).await;
            }
            outcome.orders.push(ReconciledOrder { order_id: next.id, status: next.status, payment_status: next.payment_status, updated: true });
        }
        Ok(outcome)
    }

    /// Verifies and handles a provider webhook. Returns `None` for events that
    /// are acknowledged but ignored.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<Option<ReconcileOutcome>> {
        let secret = self.settings.stripe.webhook_secret.as_deref().ok_or(ShopError::Payment(PaymentError::NotConfigured))?;
        let signature = signature.ok_or_else(|| ShopError::Unauthorized("Missing Stripe-Signature header".into()))?;
        match verify_webhook_signature(payload, signature, secret, chrono::Utc::now().timestamp()) {
            Ok(true) => {}
            Ok(false) => return Err(ShopError::Unauthorized("Invalid webhook signature".into())),
            Err(e) => return Err(ShopError::Validation(e.to_string())),
        }

        let event = WebhookEvent::parse(payload).map_err(|e| ShopError::Validation(e.to_string()))?;
        if !HANDLED_EVENTS.contains(&event.kind.as_str()) {
            tracing::debug!(kind = %event.kind, "ignoring webhook event");
            return Ok(None);
        }
        let session = event.checkout_session().ok_or_else(|| ShopError::Validation("Webhook event carries no checkout session".into()))?;
        // Re-read the session so the provider stays authoritative.
        let current = self.payments.retrieve_session(&session.id).await?;
        match self.reconcile_session(&current).await {
            Err(ShopError::NotFound(_)) => {
                tracing::info!(session_id = %current.id, "webhook session has no orders to reconcile");
                Ok(None)
            }
            other => other.map(Some),
        }
    }
}

/// Stripe checkout session ids: `cs_` then ASCII alphanumerics or `_`.
fn is_session_id(id: &str) -> bool {
    id.strip_prefix("cs_").is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::aggregates::{OrderOptions, Role};
    use crate::domain::value_objects::{Currency, WristbandType};
    use crate::events::EventBus;
    use crate::notifications::MockMailer;
    use crate::payments::MockPaymentGateway;
    use crate::pricing::{quote, PricingConfig, QuoteRequest};
    use crate::services::testing::{shop, user};
    use crate::storage::FsObjectStore;
    use crate::store::{MemoryStore, Store};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn session(id: &str, payment_status: &str, status: &str) -> SessionStatus {
        SessionStatus { id: id.into(), payment_status: payment_status.into(), status: Some(status.into()), payment_intent: Some("pi_1".into()), metadata: BTreeMap::new() }
    }

    async fn pending_order(store: &MemoryStore, owner: Uuid, session_id: Option<&str>) -> Order {
        let request = QuoteRequest { wristband_type: WristbandType::Tyvek, quantity: 1000, currency: Currency::Eur, print_type: Default::default(), has_trademark: false, has_qr_code: false };
        let q = quote(&PricingConfig::standard(WristbandType::Tyvek, Currency::Eur), &request).unwrap();
        let order = Order::place(owner, None, None, &q, OrderOptions::default());
        store.insert_order(&order).await.unwrap();
        if let Some(id) = session_id {
            store.set_checkout_session(&[order.id], id).await.unwrap();
        }
        order
    }

    #[tokio::test]
    async fn test_reconcile_twice_updates_and_notifies_once() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().times(2).returning(|id| Ok(session(id, "paid", "complete")));
        let mut mailer = MockMailer::new();
        // one confirmation and one admin alert per order
        mailer.expect_send().times(4).returning(|_| Ok(()));
        let f = shop(payments, mailer);
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let a = pending_order(&f.store, me.user_id, Some("cs_1")).await;
        let b = pending_order(&f.store, me.user_id, Some("cs_1")).await;

        let first = f.shop.update_payment_status("cs_1").await.unwrap();
        assert_eq!(first.payment_status, PaymentStatus::Paid);
        assert!(first.orders.iter().all(|o| o.updated && o.status == OrderStatus::Approved));
        let snapshot = f.store.get_order(a.id).await.unwrap().unwrap();

        let second = f.shop.update_payment_status("cs_1").await.unwrap();
        assert!(second.orders.iter().all(|o| !o.updated));
        let after = f.store.get_order(a.id).await.unwrap().unwrap();
        assert_eq!(after.updated_at, snapshot.updated_at);
        assert_eq!(f.store.get_order(b.id).await.unwrap().unwrap().payment_intent_id.as_deref(), Some("pi_1"));
    }

    #[tokio::test]
    async fn test_falls_back_to_metadata_order_ids() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().times(0);
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(|_| Ok(()));
        let f = shop(payments, mailer);
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let order = pending_order(&f.store, me.user_id, None).await;

        let mut s = session("cs_meta", "paid", "complete");
        s.metadata.insert(crate::payments::ORDER_IDS_KEY.into(), order.id.to_string());
        let outcome = f.shop.reconcile_session(&s).await.unwrap();
        assert_eq!(outcome.orders.len(), 1);
        let saved = f.store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(saved.payment_status, PaymentStatus::Paid);
        assert_eq!(saved.checkout_session_id.as_deref(), Some("cs_meta"));
    }

    #[tokio::test]
    async fn test_expired_old_session_leaves_retried_orders_alone() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(0);
        let f = shop(MockPaymentGateway::new(), mailer);
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let order = pending_order(&f.store, me.user_id, Some("cs_old")).await;
        f.store.set_checkout_session(&[order.id], "cs_new").await.unwrap();

        let mut expired = session("cs_old", "unpaid", "expired");
        expired.metadata.insert(crate::payments::ORDER_IDS_KEY.into(), order.id.to_string());
        assert!(matches!(f.shop.reconcile_session(&expired).await, Err(ShopError::NotFound("Order"))));
        let saved = f.store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(saved.payment_status, PaymentStatus::Pending);
        assert_eq!(saved.checkout_session_id.as_deref(), Some("cs_new"));
    }

    #[tokio::test]
    async fn test_expired_session_fails_without_email() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().returning(|id| Ok(session(id, "unpaid", "expired")));
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(0);
        let f = shop(payments, mailer);
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let order = pending_order(&f.store, me.user_id, Some("cs_old")).await;

        let outcome = f.shop.update_payment_status("cs_old").await.unwrap();
        assert_eq!(outcome.payment_status, PaymentStatus::Failed);
        let saved = f.store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(saved.payment_status, PaymentStatus::Failed);
        assert_eq!(saved.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_paid_order_is_never_downgraded() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().returning(|id| Ok(session(id, "unpaid", "expired")));
        let f = shop(payments, MockMailer::new());
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let mut order = pending_order(&f.store, me.user_id, Some("cs_paid")).await;
        order.apply_payment(PaymentStatus::Paid, None);
        assert!(f.store.compare_and_set_payment(&order, PaymentStatus::Pending).await.unwrap());

        let outcome = f.shop.update_payment_status("cs_paid").await.unwrap();
        assert!(!outcome.orders[0].updated);
        assert_eq!(f.store.get_order(order.id).await.unwrap().unwrap().payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_unknown_session_and_empty_id() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().returning(|id| Ok(session(id, "paid", "complete")));
        let f = shop(payments, MockMailer::new());
        assert!(matches!(f.shop.update_payment_status(" ").await, Err(ShopError::Validation(_))));
        assert!(matches!(f.shop.update_payment_status("cs_nope").await, Err(ShopError::NotFound("Order"))));
    }

    #[tokio::test]
    async fn test_malformed_session_id_never_reaches_provider() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().times(0);
        let f = shop(payments, MockMailer::new());
        for id in ["x/../../v1/customers?limit=1", "cs_", "cs_a/b", "pi_123", "cs_abc%2F"] {
            let result = f.shop.update_payment_status(id).await;
            assert!(matches!(result, Err(ShopError::Validation(ref m)) if m == "Invalid session ID"), "{id}");
        }
        assert!(is_session_id("cs_test_a1B2c3"));
    }

    fn signed(payload: &[u8], secret: &str) -> String {
        let timestamp = chrono::Utc::now().timestamp();
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, String::from_utf8_lossy(payload)).as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[tokio::test]
    async fn test_webhook_verifies_and_reconciles() {
        let mut payments = MockPaymentGateway::new();
        payments.expect_retrieve_session().withf(|id| id == "cs_hook").times(1).returning(|id| Ok(session(id, "paid", "complete")));
        payments.expect_retrieve_session().withf(|id| id == "cs_orphan").times(1).returning(|id| Ok(session(id, "unpaid", "expired")));
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(|_| Ok(()));
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut settings = Settings::default();
        settings.stripe.webhook_secret = Some("whsec_test".into());
        let shop = Shop::new(store.clone(), Arc::new(payments), Arc::new(mailer), Arc::new(FsObjectStore::new(dir.path(), "http://localhost")), EventBus::disabled(), settings);
        let me = user(&store, "a@example.com", &[Role::User]).await;
        let order = pending_order(&store, me.user_id, Some("cs_hook")).await;

        let payload = br#"{"type":"checkout.session.completed","data":{"object":{"id":"cs_hook","payment_status":"paid"}}}"#;
        assert!(matches!(shop.handle_webhook(payload, Some(&signed(payload, "wrong"))).await, Err(ShopError::Unauthorized(_))));
        assert!(matches!(shop.handle_webhook(payload, None).await, Err(ShopError::Unauthorized(_))));

        let outcome = shop.handle_webhook(payload, Some(&signed(payload, "whsec_test"))).await.unwrap().unwrap();
        assert_eq!(outcome.orders[0].order_id, order.id);

        let ignored = br#"{"type":"invoice.paid","data":{"object":{}}}"#;
        assert!(shop.handle_webhook(ignored, Some(&signed(ignored, "whsec_test"))).await.unwrap().is_none());

        let orphan = br#"{"type":"checkout.session.expired","data":{"object":{"id":"cs_orphan","payment_status":"unpaid","status":"expired"}}}"#;
        assert!(shop.handle_webhook(orphan, Some(&signed(orphan, "whsec_test"))).await.unwrap().is_none());
    }
}
