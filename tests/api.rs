use axum::{body::Body, http::{header, Request, StatusCode}, Router};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

use wristband_shop::api::{router, AppState};
use wristband_shop::auth::issue_token;
use wristband_shop::config::Settings;
use wristband_shop::domain::aggregates::Role;
use wristband_shop::events::EventBus;
use wristband_shop::notifications::MockMailer;
use wristband_shop::payments::{CheckoutSession, MockPaymentGateway, SessionStatus};
use wristband_shop::services::Shop;
use wristband_shop::storage::FsObjectStore;
use wristband_shop::store::{MemoryStore, Store};

const WEBHOOK_SECRET: &str = "whsec_test";

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
    _dir: tempfile::TempDir,
}

fn app(payments: MockPaymentGateway, mailer: MockMailer) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut settings = Settings::default();
    settings.stripe.webhook_secret = Some(WEBHOOK_SECRET.into());
    let objects = Arc::new(FsObjectStore::new(dir.path(), &settings.storage.public_base_url));
    let shop = Shop::new(store.clone(), Arc::new(payments), Arc::new(mailer), objects, EventBus::disabled(), settings);
    TestApp { app: router(AppState::new(shop), dir.path()), store, _dir: dir }
}

async fn token(store: &MemoryStore, email: &str, role: Role) -> String {
    issue_token(store, email, Some("Test User".into()), role).await.unwrap().1
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn address() -> Value {
    json!({ "name": "Ada Lovelace", "address": "1 Analytical Way", "city": "London", "zipCode": "N1 9GU", "country": "UK" })
}

#[tokio::test]
async fn test_health() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let (status, body) = call(&t.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_get_pricing() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let (status, body) = call(&t.app, "POST", "/functions/v1/get-pricing", None, Some(json!({ "wristbandType": "tyvek", "quantity": 2000, "hasTrademark": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalPrice"].as_f64(), Some(108.0));
    assert_eq!(body["minQuantity"], 1000);

    let (status, body) = call(&t.app, "POST", "/functions/v1/get-pricing", None, Some(json!({ "wristbandType": "tyvek", "quantity": 500 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["minQuantity"], 1000);
    assert_eq!(body["error"], "Minimum quantity is 1000 pieces");
}

#[tokio::test]
async fn test_auth_required() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let (status, body) = call(&t.app, "GET", "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(&t.app, "GET", "/api/v1/orders", Some("wb_nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = token(&t.store, "a@example.com", Role::User).await;
    let (status, _) = call(&t.app, "GET", "/api/v1/admin/stats", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_checkout_then_payment_return() {
    let mut payments = MockPaymentGateway::new();
    payments.expect_create_checkout_session()
        .withf(|r| r.line_items.len() == 2 && r.success_url.starts_with("http://localhost:5173/payment-success"))
        .times(1)
        .returning(|_| Ok(CheckoutSession { id: "cs_api".into(), url: Some("https://pay/cs_api".into()) }));
    payments.expect_retrieve_session()
        .withf(|id| id == "cs_api")
        .times(2)
        .returning(|id| Ok(SessionStatus { id: id.into(), payment_status: "paid".into(), status: Some("complete".into()), payment_intent: Some("pi_1".into()), ..Default::default() }));
    let mut mailer = MockMailer::new();
    // confirmation + admin alert for each of the two orders, once
    mailer.expect_send().times(4).returning(|_| Ok(()));
    let t = app(payments, mailer);
    let user = token(&t.store, "a@example.com", Role::User).await;

    let item = json!({ "imageUrl": "https://cdn/x.png", "item": { "quantity": 1000, "wristbandType": "silicone" } });
    let (status, body) = call(&t.app, "POST", "/api/v1/checkout", Some(&user), Some(json!({ "items": [item.clone(), item], "shippingAddress": address(), "expressDelivery": true }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["sessionId"], "cs_api");
    assert_eq!(body["orderIds"].as_array().map(Vec::len), Some(2));

    for _ in 0..2 {
        let (status, body) = call(&t.app, "POST", "/functions/v1/update-payment-status", None, Some(json!({ "sessionId": "cs_api" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paymentStatus"], "paid");
    }

    let (_, orders) = call(&t.app, "GET", "/api/v1/orders", Some(&user), None).await;
    let orders = orders.as_array().unwrap().clone();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["payment_status"] == "paid" && o["status"] == "approved"));
}

#[tokio::test]
async fn test_checkout_below_minimum_creates_nothing() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let user = token(&t.store, "a@example.com", Role::User).await;
    let item = json!({ "imageUrl": "https://cdn/x.png", "item": { "quantity": 999 } });
    let (status, body) = call(&t.app, "POST", "/api/v1/checkout", Some(&user), Some(json!({ "items": [item], "shippingAddress": address() }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["minQuantity"], 1000);
    let (_, orders) = call(&t.app, "GET", "/api/v1/orders", Some(&user), None).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn test_update_payment_status_requires_session() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let (status, body) = call(&t.app, "POST", "/functions/v1/update-payment-status", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Session ID is required");

    let (status, body) = call(&t.app, "POST", "/functions/v1/update-payment-status", None, Some(json!({ "sessionId": "../v1/customers" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid session ID");
}

#[tokio::test]
async fn test_webhook_signature() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let payload = json!({ "type": "customer.created", "data": { "object": {} } }).to_string();
    let now = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{now}.{payload}").as_bytes());
    let signature = format!("t={now},v1={}", hex::encode(mac.finalize().into_bytes()));

    let send = |sig: String| {
        let request = Request::builder().method("POST").uri("/functions/v1/stripe-webhook").header("stripe-signature", sig).body(Body::from(payload.clone())).unwrap();
        t.app.clone().oneshot(request)
    };
    let ok = send(signature).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let forged = send(format!("t={now},v1={}", "0".repeat(64))).await.unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_designs_and_admin_stats() {
    let t = app(MockPaymentGateway::new(), MockMailer::new());
    let user = token(&t.store, "a@example.com", Role::User).await;
    let admin = token(&t.store, "admin@example.com", Role::Admin).await;

    let (status, design) = call(&t.app, "POST", "/api/v1/designs", Some(&user), Some(json!({ "imageUrl": "https://cdn/x.png", "customText": "VIP" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = design["id"].as_str().unwrap().to_string();
    let (_, list) = call(&t.app, "GET", "/api/v1/designs", Some(&user), None).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = call(&t.app, "DELETE", &format!("/api/v1/designs/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(t.store.list_designs(design_owner(&design)).await.unwrap().is_empty());

    let (status, stats) = call(&t.app, "GET", "/api/v1/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalOrders"], 0);
}

fn design_owner(design: &Value) -> uuid::Uuid {
    design["owner"].as_str().unwrap().parse().unwrap()
}
