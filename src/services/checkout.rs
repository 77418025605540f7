//! Order aggregation and checkout session creation.
//!
//! A checkout turns cart entries into pending orders, merges the shipping address
//! into every order and the express surcharge into the first, and opens one payment
//! session covering all of them. A failure at any step aborts the flow; orders created before the
//! failure are left in place as pending.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use super::Shop;
use crate::auth::Identity;
use crate::domain::aggregates::{Cart, CartEntry, CartLine, Order, PaymentStatus};
use crate::domain::value_objects::{Money, PrintType, ShippingAddress, WristbandType};
use crate::payments::{join_order_ids, CheckoutSessionRequest, LineItem, ORDER_IDS_KEY, USER_ID_KEY};
use crate::pricing::QuoteRequest;
use crate::{Result, ShopError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CartEntry>,
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub express_delivery: bool,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: Option<String>,
    pub session_id: String,
    pub order_ids: Vec<Uuid>,
}

fn product_description(wristband_type: WristbandType, order: &Order) -> String {
    let mut description = format!("Custom {} wristband", wristband_type.as_str());
    match order.options.print_type {
        PrintType::Black => description.push_str(" with black print"),
        PrintType::FullColor => description.push_str(" with full color print"),
        PrintType::None => {}
    }
    if order.options.has_qr_code {
        description.push_str(" + secure guests option");
    }
    description
}

impl Shop {
    /// Full cart checkout: create missing designs and orders, merge shipping and
    /// express delivery, then open a payment session for all orders.
    pub async fn checkout(&self, identity: &Identity, request: CheckoutRequest, origin: Option<&str>) -> Result<CheckoutResponse> {
        request.shipping_address.validate()?;
        let cart = Cart::from_entries(request.items)?;
        if let Some(supplier_id) = request.supplier_id {
            self.store.get_supplier(supplier_id).await?.ok_or(ShopError::NotFound("Supplier"))?;
        }

        let mut order_ids = Vec::with_capacity(cart.item_count());
        for line in cart.into_lines() {
            let id = match line {
                CartLine::Existing(id) => id,
                CartLine::New { design, item } => {
                    let design = self.resolve_design(identity.user_id, design.with_default_type(item.wristband_type)).await?;
                    let quote = self.quote(&QuoteRequest {
                        wristband_type: item.wristband_type.unwrap_or(design.wristband_type),
                        quantity: item.quantity,
                        currency: item.currency,
                        print_type: item.print_type,
                        has_trademark: item.has_trademark,
                        has_qr_code: item.has_qr_code,
                    }).await?;
                    let mut order = Order::place(identity.user_id, Some(design.id), request.supplier_id, &quote, item.options());
                    self.store.insert_order(&order).await?;
                    tracing::info!(order_id = %order.id, total = %order.total_price, "order created");
                    self.publish(order.take_events()).await;
                    order.id
                }
            };
            order_ids.push(id);
        }

        let mut orders = self.checkout_orders(identity, &order_ids).await?;
        let fee = request.express_delivery.then_some(self.settings.express_delivery_fee);
        for (index, order) in orders.iter_mut().enumerate() {
            order.ship_to(request.shipping_address.clone());
            // One surcharge per checkout, carried by the first order.
            order.set_express_delivery(if index == 0 { fee } else { None });
            if order.supplier_id.is_none() {
                order.supplier_id = request.supplier_id;
            }
            self.store.save_order(order).await?;
        }

        self.start_session(identity, &mut orders, origin).await
    }

    /// Checkout for orders that already carry address and totals.
    pub async fn create_checkout(&self, identity: &Identity, order_ids: Vec<Uuid>, origin: Option<&str>) -> Result<CheckoutResponse> {
        if order_ids.is_empty() {
            return Err(ShopError::Validation("Missing orderId in request".into()));
        }
        let mut orders = self.checkout_orders(identity, &order_ids).await?;
        self.start_session(identity, &mut orders, origin).await
    }

    /// Loads the orders, checking ownership, a shared currency and that none is paid.
    async fn checkout_orders(&self, identity: &Identity, order_ids: &[Uuid]) -> Result<Vec<Order>> {
        let mut unique = order_ids.to_vec();
        unique.sort();
        unique.dedup();
        let orders = self.store.get_orders(&unique).await?;
        if orders.len() != unique.len() {
            return Err(ShopError::NotFound("Order"));
        }
        let currency = orders[0].currency;
        for order in &orders {
            if order.owner != identity.user_id {
                return Err(ShopError::Forbidden("Order belongs to another user".into()));
            }
            if order.payment_status == PaymentStatus::Paid {
                return Err(ShopError::Conflict(format!("Order {} is already paid", order.short_id())));
            }
            if order.currency != currency {
                return Err(ShopError::Validation("All orders in a checkout must use the same currency".into()));
            }
        }
        Ok(orders)
    }

    async fn start_session(&self, identity: &Identity, orders: &mut [Order], origin: Option<&str>) -> Result<CheckoutResponse> {
        let mut line_items = Vec::with_capacity(orders.len());
        for order in orders.iter() {
            if order.total_price <= Decimal::ZERO {
                return Err(ShopError::Validation(format!("Invalid order total price: {}", order.total_price)));
            }
            let unit_amount = Money::new(order.total_price, order.currency).minor_units()
                .ok_or_else(|| ShopError::Validation(format!("Invalid order total price: {}", order.total_price)))?;
            let wristband_type = match order.design_id {
                Some(id) => self.store.get_design(id).await?.map(|d| d.wristband_type).unwrap_or_default(),
                None => WristbandType::default(),
            };
            line_items.push(LineItem {
                name: format!("EU Wristbands - {}", wristband_type.label()),
                description: product_description(wristband_type, order),
                unit_amount,
                currency: order.currency,
                quantity: 1,
            });
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let origin = origin.unwrap_or(self.settings.site_url.as_str()).trim_end_matches('/');
        let customer_email = self.store.get_profile(identity.user_id).await?.map(|p| p.email);
        let request = CheckoutSessionRequest {
            line_items,
            success_url: format!("{origin}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/design-studio?canceled=true"),
            customer_email,
            metadata: BTreeMap::from([
                (ORDER_IDS_KEY.to_string(), join_order_ids(&ids)),
                (USER_ID_KEY.to_string(), identity.user_id.to_string()),
            ]),
        };

        let session = self.payments.create_checkout_session(request).await?;
        let updated = self.store.set_checkout_session(&ids, &session.id).await?;
        tracing::info!(session_id = %session.id, orders = updated, "checkout session attached");
        for order in orders.iter_mut() {
            order.attach_checkout_session(&session.id);
            self.publish(order.take_events()).await;
        }

        Ok(CheckoutResponse { url: session.url, session_id: session.id, order_ids: ids })
    }
}
