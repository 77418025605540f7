use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::payments::PaymentError;
use crate::storage::ObjectStoreError;
use crate::store::StoreError;
use crate::ShopError;

impl ShopError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) | Self::BelowMinimumQuantity { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::Store(StoreError::AlreadyExists) => StatusCode::CONFLICT,
            Self::Store(StoreError::InvalidReference) => StatusCode::BAD_REQUEST,
            Self::Payment(PaymentError::MalformedSignature | PaymentError::InvalidPayload(_)) => StatusCode::BAD_REQUEST,
            Self::Payment(PaymentError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            Self::Objects(ObjectStoreError::InvalidDataUrl | ObjectStoreError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            Self::Payment(_) | Self::Email(_) | Self::Objects(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }
        let body = match &self {
            Self::BelowMinimumQuantity { minimum, .. } => json!({ "error": self.to_string(), "minQuantity": minimum }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
