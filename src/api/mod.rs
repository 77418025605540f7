//! HTTP surface: the `/functions/v1` endpoints the storefront calls, the
//! `/api/v1` REST resources and the public design bucket.

use axum::{http::{header::ORIGIN, HeaderMap}, routing::get, Json, Router};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::services::Shop;
use crate::storage::DESIGN_BUCKET;

pub mod auth;
pub mod error;
pub mod functions;
pub mod rest;

pub use auth::AuthUser;

#[derive(Clone)]
pub struct AppState {
    pub shop: Shop,
}

impl AppState {
    pub fn new(shop: Shop) -> Self { Self { shop } }
}

pub fn router(state: AppState, storage_root: &Path) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "wristband-shop"})) }))
        .nest("/functions/v1", functions::routes())
        .nest("/api/v1", rest::routes())
        .nest_service(&format!("/storage/{DESIGN_BUCKET}"), ServeDir::new(storage_root.join(DESIGN_BUCKET)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Browser origin used for the payment page's return URLs.
pub(crate) fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(ORIGIN).and_then(|v| v.to_str().ok()).filter(|o| o.starts_with("http"))
}
