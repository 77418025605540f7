use axum::{extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};

use super::AppState;
use crate::auth::{authenticate, Identity};
use crate::ShopError;

/// Caller resolved from `Authorization: Bearer <token>`.
pub struct AuthUser(pub Identity);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ShopError::Unauthorized("No authorization header".into()))?;
        authenticate(state.shop.store(), token).await?
            .map(AuthUser)
            .ok_or_else(|| ShopError::Unauthorized("Unauthorized".into()))
    }
}
