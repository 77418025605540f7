//! Pricing calculator.
//!
//! A quote is a pure function of the tariff for one wristband type/currency and the
//! options picked in the studio. Per-unit components (base price, print) make up the
//! unit price; trademark and QR code add-ons are flat per-order charges billed per
//! thousand bands.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{order_total, round_cents, Currency, ExtraCharges, PrintType, Quantity, QuantityError, WristbandType};

pub const DEFAULT_MIN_QUANTITY: u32 = 1000;

/// Tariff for one wristband type in one currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub wristband_type: WristbandType,
    pub currency: Currency,
    pub min_quantity: u32,
    /// Per band.
    pub base_price: Decimal,
    /// Per band.
    pub black_print_extra: Decimal,
    /// Per band.
    pub full_color_print_extra: Decimal,
    pub trademark_per_thousand: Decimal,
    pub qr_code_per_thousand: Decimal,
}

impl PricingConfig {
    /// Built-in tariff: 39 per 1000 bands regardless of print, 15 per 1000 for each add-on.
    pub fn standard(wristband_type: WristbandType, currency: Currency) -> Self {
        Self {
            wristband_type, currency,
            min_quantity: DEFAULT_MIN_QUANTITY,
            base_price: Decimal::new(39, 3),
            black_print_extra: Decimal::ZERO,
            full_color_print_extra: Decimal::ZERO,
            trademark_per_thousand: Decimal::new(15, 0),
            qr_code_per_thousand: Decimal::new(15, 0),
        }
    }

    fn print_extra(&self, print_type: PrintType) -> Decimal {
        match print_type {
            PrintType::None => Decimal::ZERO,
            PrintType::Black => self.black_print_extra,
            PrintType::FullColor => self.full_color_print_extra,
        }
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        let amounts = [self.base_price, self.black_print_extra, self.full_color_print_extra, self.trademark_per_thousand, self.qr_code_per_thousand];
        if self.min_quantity == 0 || amounts.iter().any(Decimal::is_sign_negative) || self.base_price.is_zero() {
            return Err(PricingError::InvalidConfig);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub wristband_type: WristbandType,
    pub quantity: u32,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub print_type: PrintType,
    #[serde(default)]
    pub has_trademark: bool,
    #[serde(default, alias = "hasSecureGuests")]
    pub has_qr_code: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub wristband_type: WristbandType,
    pub base_price: Decimal,
    pub extra_charges: ExtraCharges,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub quantity: Quantity,
    pub currency: Currency,
    pub min_quantity: u32,
}

pub fn quote(config: &PricingConfig, request: &QuoteRequest) -> Result<PriceQuote, PricingError> {
    let quantity = Quantity::at_least(request.quantity, config.min_quantity)?;
    let unit_price = config.base_price + config.print_extra(request.print_type);

    let mut extra_charges = ExtraCharges::new();
    if request.has_trademark {
        extra_charges.set(ExtraCharges::TRADEMARK, round_cents(config.trademark_per_thousand * quantity.thousands()));
    }
    if request.has_qr_code {
        extra_charges.set(ExtraCharges::QR_CODE, round_cents(config.qr_code_per_thousand * quantity.thousands()));
    }

    Ok(PriceQuote {
        wristband_type: config.wristband_type,
        base_price: config.base_price,
        total_price: order_total(unit_price, quantity, &extra_charges),
        extra_charges, unit_price, quantity,
        currency: config.currency,
        min_quantity: config.min_quantity,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Quantity(#[from] QuantityError),
    #[error("Pricing configuration is invalid")]
    InvalidConfig,
}
