//! Domain events
use crate::domain::aggregates::{OrderStatus, PaymentStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Design(DesignEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        match self {
            Self::Design(e) => format!("wristbands.designs.{}", e.name()),
            Self::Order(e) => format!("wristbands.orders.{}", e.name()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DesignEvent {
    Saved { design_id: Uuid, owner: Uuid },
    Deleted { design_id: Uuid, owner: Uuid },
}

impl DesignEvent {
    fn name(&self) -> &'static str {
        match self { Self::Saved { .. } => "saved", Self::Deleted { .. } => "deleted" }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, owner: Uuid, total: Decimal },
    CheckoutStarted { order_id: Uuid, session_id: String },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    PaymentUpdated { order_id: Uuid, payment_status: PaymentStatus },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::CheckoutStarted { .. } => "checkout_started",
            Self::StatusChanged { .. } => "status_changed",
            Self::PaymentUpdated { .. } => "payment_updated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects() {
        let id = Uuid::now_v7();
        let e = DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, from: OrderStatus::Pending, to: OrderStatus::Approved });
        assert_eq!(e.subject(), "wristbands.orders.status_changed");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["to"], "approved");
        assert_eq!(json["event"], "status_changed");
    }
}
