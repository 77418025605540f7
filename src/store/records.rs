//! Row shapes as stored, and their conversion into domain aggregates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::{Design, Order, OrderOptions, Profile, Supplier};
use crate::domain::value_objects::{ExtraCharges, Quantity, ShippingAddress};
use crate::pricing::PricingConfig;
use crate::store::StoreError;

fn parse<T: FromStr>(value: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProfileRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<ProfileRecord> for Profile {
    fn from(r: ProfileRecord) -> Self { Profile { id: r.id, email: r.email, full_name: r.full_name } }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct DesignRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub design_url: String,
    pub wristband_color: String,
    pub wristband_type: String,
    pub custom_text: Option<String>,
    pub text_color: Option<String>,
    pub text_position: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DesignRecord> for Design {
    type Error = StoreError;
    fn try_from(r: DesignRecord) -> Result<Self, Self::Error> {
        Ok(Design {
            id: r.id, owner: r.user_id, image_url: r.design_url, color: r.wristband_color,
            wristband_type: parse(&r.wristband_type)?, custom_text: r.custom_text, text_color: r.text_color,
            text_position: r.text_position.map(|j| j.0), created_at: r.created_at, events: vec![],
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SupplierRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SupplierRecord> for Supplier {
    fn from(r: SupplierRecord) -> Self {
        Supplier {
            id: r.id, owner: r.user_id, company_name: r.company_name, contact_email: r.contact_email,
            contact_phone: r.contact_phone, address: r.address, created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct OrderRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub design_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub base_price: Decimal,
    pub total_price: Decimal,
    pub currency: String,
    pub print_type: String,
    pub has_trademark: bool,
    pub trademark_text: Option<String>,
    pub has_secure_guests: bool,
    pub extra_charges: Json<ExtraCharges>,
    pub status: String,
    pub payment_status: String,
    pub shipping_address: Option<Json<ShippingAddress>>,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRecord> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRecord) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id, owner: r.user_id, design_id: r.design_id, supplier_id: r.supplier_id,
            quantity: Quantity::from_stored(to_u32(r.quantity, "quantity")?),
            unit_price: r.unit_price, base_price: r.base_price, total_price: r.total_price,
            currency: parse(&r.currency)?,
            options: OrderOptions {
                print_type: parse(&r.print_type)?, has_trademark: r.has_trademark,
                trademark_text: r.trademark_text, has_qr_code: r.has_secure_guests,
            },
            extra_charges: r.extra_charges.0,
            status: parse(&r.status)?, payment_status: parse(&r.payment_status)?,
            shipping_address: r.shipping_address.map(|j| j.0),
            checkout_session_id: r.stripe_session_id, payment_intent_id: r.stripe_payment_intent_id,
            admin_notes: r.admin_notes, created_at: r.created_at, updated_at: r.updated_at,
            events: vec![],
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct PricingRecord {
    pub wristband_type: String,
    pub currency: String,
    pub min_quantity: i32,
    pub base_price: Decimal,
    pub black_print_extra: Decimal,
    pub full_color_print_extra: Decimal,
    pub trademark_per_thousand: Decimal,
    pub qr_code_per_thousand: Decimal,
}

impl TryFrom<PricingRecord> for PricingConfig {
    type Error = StoreError;
    fn try_from(r: PricingRecord) -> Result<Self, Self::Error> {
        Ok(PricingConfig {
            wristband_type: parse(&r.wristband_type)?, currency: parse(&r.currency)?,
            min_quantity: to_u32(r.min_quantity, "min_quantity")?,
            base_price: r.base_price, black_print_extra: r.black_print_extra,
            full_color_print_extra: r.full_color_print_extra,
            trademark_per_thousand: r.trademark_per_thousand, qr_code_per_thousand: r.qr_code_per_thousand,
        })
    }
}
