//! `/functions/v1/*`: the endpoints the storefront invokes directly.

use axum::{body::Bytes, extract::State, http::HeaderMap, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{request_origin, AppState, AuthUser};
use crate::notifications::NotificationKind;
use crate::pricing::{PriceQuote, QuoteRequest};
use crate::services::{CheckoutResponse, ReconcileOutcome, StatusUpdate};
use crate::{Result, ShopError};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/get-pricing", post(get_pricing))
        .route("/create-checkout", post(create_checkout))
        .route("/update-payment-status", post(update_payment_status))
        .route("/stripe-webhook", post(stripe_webhook))
        .route("/update-order-status", post(update_order_status))
        .route("/send-order-confirmation", post(send_order_confirmation))
        .route("/send-admin-notification", post(send_admin_notification))
        .route("/send-supplier-notification", post(send_supplier_notification))
        .route("/send-verification-email", post(send_verification_email))
}

async fn get_pricing(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> Result<Json<PriceQuote>> {
    Ok(Json(s.shop.quote(&r).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub order_ids: Option<Vec<Uuid>>,
}

impl CreateCheckoutRequest {
    fn ids(self) -> Vec<Uuid> {
        match (self.order_ids, self.order_id) {
            (Some(ids), _) if !ids.is_empty() => ids,
            (_, Some(id)) => vec![id],
            _ => vec![],
        }
    }
}

async fn create_checkout(State(s): State<AppState>, AuthUser(me): AuthUser, headers: HeaderMap, Json(r): Json<CreateCheckoutRequest>) -> Result<Json<CheckoutResponse>> {
    let ids = r.ids();
    if ids.is_empty() {
        return Err(ShopError::Validation("Order ID is required".into()));
    }
    Ok(Json(s.shop.create_checkout(&me, ids, request_origin(&headers)).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    pub session_id: String,
}

async fn update_payment_status(State(s): State<AppState>, Json(r): Json<SessionRequest>) -> Result<Json<ReconcileOutcome>> {
    Ok(Json(s.shop.update_payment_status(r.session_id.trim()).await?))
}

async fn stripe_webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let outcome = s.shop.handle_webhook(&body, signature).await?;
    Ok(Json(json!({ "received": true, "handled": outcome.is_some() })))
}

async fn update_order_status(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<StatusUpdate>) -> Result<Json<Value>> {
    let order = s.shop.update_order_status(&me, r).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

async fn notify(s: &AppState, me: &crate::auth::Identity, kind: NotificationKind, r: OrderRef) -> Result<Json<Value>> {
    let order_id = r.order_id.ok_or_else(|| ShopError::Validation("Order ID is required".into()))?;
    s.shop.send_notification(me, kind, order_id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn send_order_confirmation(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<OrderRef>) -> Result<Json<Value>> {
    notify(&s, &me, NotificationKind::Confirmation, r).await
}

async fn send_admin_notification(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<OrderRef>) -> Result<Json<Value>> {
    notify(&s, &me, NotificationKind::AdminAlert, r).await
}

async fn send_supplier_notification(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<OrderRef>) -> Result<Json<Value>> {
    notify(&s, &me, NotificationKind::SupplierAlert, r).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    #[serde(default)]
    pub confirmation_url: String,
}

async fn send_verification_email(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<VerificationRequest>) -> Result<Json<Value>> {
    s.shop.send_verification_email(&me, &r.confirmation_url).await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_ids_prefer_list() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(CreateCheckoutRequest { order_id: Some(a), order_ids: Some(vec![b]) }.ids(), vec![b]);
        assert_eq!(CreateCheckoutRequest { order_id: Some(a), order_ids: Some(vec![]) }.ids(), vec![a]);
        assert!(CreateCheckoutRequest { order_id: None, order_ids: None }.ids().is_empty());
    }
}
