//! `/api/v1/*` resources for the dashboards and the design studio.

use axum::{extract::{Path, State}, http::{HeaderMap, StatusCode}, routing::{delete, get, post, put}, Json, Router};
use uuid::Uuid;

use super::{request_origin, AppState, AuthUser};
use crate::domain::aggregates::{Design, Order, Supplier, SupplierSignup};
use crate::pricing::PricingConfig;
use crate::services::{AdminStats, CheckoutRequest, CheckoutResponse, SaveDesignRequest};
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/designs", get(list_designs).post(create_design))
        .route("/designs/:id", delete(delete_design))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/suppliers", get(list_suppliers).post(supplier_signup))
        .route("/supplier/orders", get(supplier_orders))
        .route("/admin/orders", get(admin_orders))
        .route("/admin/stats", get(admin_stats))
        .route("/admin/pricing", put(update_pricing))
}

async fn checkout(State(s): State<AppState>, AuthUser(me): AuthUser, headers: HeaderMap, Json(r): Json<CheckoutRequest>) -> Result<Json<CheckoutResponse>> {
    Ok(Json(s.shop.checkout(&me, r, request_origin(&headers)).await?))
}

async fn list_designs(State(s): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<Design>>> {
    Ok(Json(s.shop.list_designs(&me).await?))
}

async fn create_design(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<SaveDesignRequest>) -> Result<(StatusCode, Json<Design>)> {
    Ok((StatusCode::CREATED, Json(s.shop.save_design(&me, r).await?)))
}

async fn delete_design(State(s): State<AppState>, AuthUser(me): AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.shop.delete_design(&me, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_orders(State(s): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.shop.my_orders(&me).await?))
}

async fn get_order(State(s): State<AppState>, AuthUser(me): AuthUser, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.shop.order_for(&me, id).await?))
}

async fn list_suppliers(State(s): State<AppState>) -> Result<Json<Vec<Supplier>>> {
    Ok(Json(s.shop.list_suppliers().await?))
}

async fn supplier_signup(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<SupplierSignup>) -> Result<(StatusCode, Json<Supplier>)> {
    Ok((StatusCode::CREATED, Json(s.shop.register_supplier(&me, r).await?)))
}

async fn supplier_orders(State(s): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.shop.supplier_orders(&me).await?))
}

async fn admin_orders(State(s): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.shop.admin_orders(&me).await?))
}

async fn admin_stats(State(s): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<AdminStats>> {
    Ok(Json(s.shop.admin_stats(&me).await?))
}

async fn update_pricing(State(s): State<AppState>, AuthUser(me): AuthUser, Json(r): Json<PricingConfig>) -> Result<Json<PricingConfig>> {
    Ok(Json(s.shop.update_pricing(&me, r).await?))
}
