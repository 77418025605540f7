//! Payment provider seam.
//!
//! The checkout pipeline talks to the provider only through [`PaymentGateway`]:
//! create a hosted checkout session for a set of orders, and read a session back
//! to learn its authoritative payment state.

use async_trait::async_trait;
use mockall::automock;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::PaymentStatus;
use crate::domain::value_objects::Currency;

pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;
pub use webhook::verify_webhook_signature;

/// Session metadata key holding the comma-separated order ids.
pub const ORDER_IDS_KEY: &str = "order_ids";
pub const USER_ID_KEY: &str = "user_id";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider is not configured")]
    NotConfigured,

    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed webhook signature header")]
    MalformedSignature,

    #[error("webhook signature mismatch")]
    InvalidSignature,

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    /// Minor units (cents).
    pub unit_amount: i64,
    pub currency: Currency,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSessionRequest {
    pub fn order_ids(&self) -> Vec<Uuid> {
        parse_order_ids(self.metadata.get(ORDER_IDS_KEY).map(String::as_str))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// What the provider reports for a checkout session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    /// `open`, `complete` or `expired`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SessionStatus {
    pub fn verdict(&self) -> PaymentStatus {
        match (self.payment_status.as_str(), self.status.as_deref()) {
            ("paid" | "no_payment_required", _) => PaymentStatus::Paid,
            (_, Some("expired")) => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }

    pub fn order_ids(&self) -> Vec<Uuid> {
        parse_order_ids(self.metadata.get(ORDER_IDS_KEY).map(String::as_str))
    }
}

fn parse_order_ids(raw: Option<&str>) -> Vec<Uuid> {
    raw.unwrap_or_default()
        .split(',')
        .filter_map(|id| Uuid::parse_str(id.trim()).ok())
        .collect()
}

pub fn join_order_ids(ids: &[Uuid]) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted checkout session.
    async fn create_checkout_session(&self, request: CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError>;

    /// Fetches the current state of a session.
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(payment_status: &str, status: Option<&str>) -> SessionStatus {
        SessionStatus { id: "cs_1".into(), payment_status: payment_status.into(), status: status.map(Into::into), ..Default::default() }
    }

    #[test]
    fn test_verdict_mapping() {
        assert_eq!(status("paid", Some("complete")).verdict(), PaymentStatus::Paid);
        assert_eq!(status("no_payment_required", None).verdict(), PaymentStatus::Paid);
        assert_eq!(status("unpaid", Some("expired")).verdict(), PaymentStatus::Failed);
        assert_eq!(status("unpaid", Some("open")).verdict(), PaymentStatus::Pending);
    }

    #[test]
    fn test_order_ids_metadata() {
        let ids = vec![Uuid::now_v7(), Uuid::now_v7()];
        let mut s = status("paid", None);
        s.metadata.insert(ORDER_IDS_KEY.into(), join_order_ids(&ids));
        assert_eq!(s.order_ids(), ids);
        s.metadata.insert(ORDER_IDS_KEY.into(), "garbage, ".into());
        assert!(s.order_ids().is_empty());
    }
}
