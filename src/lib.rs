//! Wristband Shop - custom wristband storefront backend
//!
//! Design records from the browser studio, server-side pricing, multi-order
//! checkout through a hosted payment page, payment reconciliation and order
//! management for admins and suppliers.
//!
//! ## Features
//! - Pricing calculator per wristband type and currency
//! - Cart checkout creating designs and orders, with shipping and express surcharge
//! - Stripe checkout sessions and webhook-driven reconciliation
//! - Templated notification emails
//! - Admin and supplier dashboards

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod events;
pub mod notifications;
pub mod payments;
pub mod pricing;
pub mod services;
pub mod storage;
pub mod store;

use thiserror::Error;

use crate::domain::aggregates::{CartError, OrderError};
use crate::notifications::MailError;
use crate::payments::PaymentError;
use crate::pricing::PricingError;
use crate::storage::ObjectStoreError;
use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("Minimum quantity is {minimum} pieces")]
    BelowMinimumQuantity { minimum: u32, requested: u32 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Email provider error: {0}")]
    Email(#[from] MailError),

    #[error("Object storage error: {0}")]
    Objects(#[from] ObjectStoreError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<PricingError> for ShopError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::Quantity(crate::domain::value_objects::QuantityError::BelowMinimum { minimum, requested }) => {
                Self::BelowMinimumQuantity { minimum, requested }
            }
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self { Self::Validation(e.to_string()) }
}

impl From<CartError> for ShopError {
    fn from(e: CartError) -> Self { Self::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, ShopError>;
