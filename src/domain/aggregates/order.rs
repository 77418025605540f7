//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{order_total, Currency, ExtraCharges, Money, PrintType, Quantity, ShippingAddress, UnknownVariant};
use crate::pricing::PriceQuote;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Approved, Declined, Processing, Completed, Cancelled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [Self::Pending, Self::Approved, Self::Declined, Self::Processing, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending", Self::Approved => "approved", Self::Declined => "declined",
            Self::Processing => "processing", Self::Completed => "completed", Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }

    /// Whether `self -> next` is an edge of the status machine.
    pub fn can_become(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (Pending, Approved | Declined) => true,
            (Approved, Processing) => true,
            (Processing, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| UnknownVariant::new("status", s))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed" }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownVariant::new("payment status", s)),
        }
    }
}

/// Customisation options chosen in the design studio.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOptions {
    pub print_type: PrintType,
    pub has_trademark: bool,
    pub trademark_text: Option<String>,
    pub has_qr_code: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub owner: Uuid,
    pub design_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    pub base_price: Decimal,
    pub total_price: Decimal,
    pub currency: Currency,
    #[serde(flatten)]
    pub options: OrderOptions,
    pub extra_charges: ExtraCharges,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: Option<ShippingAddress>,
    pub checkout_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

impl Order {
    /// Places a pending order priced from a server-side quote.
    pub fn place(owner: Uuid, design_id: Option<Uuid>, supplier_id: Option<Uuid>, quote: &PriceQuote, options: OrderOptions) -> Self {
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), owner, design_id, supplier_id,
            quantity: quote.quantity, unit_price: quote.unit_price, base_price: quote.base_price,
            total_price: Decimal::ZERO, currency: quote.currency, options,
            extra_charges: quote.extra_charges.clone(),
            status: OrderStatus::Pending, payment_status: PaymentStatus::Pending,
            shipping_address: None, checkout_session_id: None, payment_intent_id: None, admin_notes: None,
            created_at: now, updated_at: now, events: vec![],
        };
        order.recalculate();
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: order.id, owner, total: order.total_price }));
        order
    }

    pub fn total(&self) -> Money { Money::new(self.total_price, self.currency) }
    pub fn short_id(&self) -> String { self.id.simple().to_string().chars().take(8).collect() }

    pub fn ship_to(&mut self, address: ShippingAddress) {
        self.shipping_address = Some(address);
        self.touch();
    }

    /// Sets the express surcharge (or removes it) and recomputes the total.
    /// Replaces any surcharge left by an earlier checkout attempt.
    pub fn set_express_delivery(&mut self, fee: Option<Decimal>) {
        match fee {
            Some(fee) => self.extra_charges.set(ExtraCharges::EXPRESS, fee),
            None => { self.extra_charges.remove(ExtraCharges::EXPRESS); }
        }
        self.recalculate();
    }

    pub fn attach_checkout_session(&mut self, session_id: &str) {
        self.checkout_session_id = Some(session_id.to_string());
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::CheckoutStarted { order_id: self.id, session_id: session_id.to_string() }));
    }

    /// Moves the order along the status machine. Returns `false` for a repeat of the current status.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<bool, OrderError> {
        if self.status == next { return Ok(false); }
        if !self.status.can_become(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        let from = std::mem::replace(&mut self.status, next);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: next }));
        Ok(true)
    }

    pub fn annotate(&mut self, notes: impl Into<String>) {
        self.admin_notes = Some(notes.into());
        self.touch();
    }

    /// Applies the provider's payment verdict. A paid order is never downgraded.
    /// Returns whether anything changed.
    pub fn apply_payment(&mut self, verdict: PaymentStatus, payment_intent: Option<String>) -> bool {
        if self.payment_status == PaymentStatus::Paid || self.payment_status == verdict {
            return false;
        }
        self.payment_status = verdict;
        if payment_intent.is_some() { self.payment_intent_id = payment_intent; }
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentUpdated { order_id: self.id, payment_status: verdict }));
        if verdict == PaymentStatus::Paid && self.status == OrderStatus::Pending {
            self.status = OrderStatus::Approved;
            self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from: OrderStatus::Pending, to: OrderStatus::Approved }));
        }
        self.touch();
        true
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }

    fn recalculate(&mut self) {
        self.total_price = order_total(self.unit_price, self.quantity, &self.extra_charges);
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
