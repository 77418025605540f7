//! Value Objects for the wristband shop

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Settlement currency. Prices are configured per currency, never converted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self { Self::Eur => "EUR", Self::Usd => "USD", Self::Gbp => "GBP" }
    }
    pub fn symbol(&self) -> &'static str {
        match self { Self::Eur => "€", Self::Usd => "$", Self::Gbp => "£" }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

impl FromStr for Currency {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EUR" => Ok(Self::Eur),
            "USD" => Ok(Self::Usd),
            "GBP" => Ok(Self::Gbp),
            _ => Err(UnknownVariant::new("currency", s)),
        }
    }
}

/// Material category of a wristband; drives pricing and print constraints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WristbandType {
    #[default]
    Tyvek,
    Vinyl,
    Silicone,
    Fabric,
}

impl WristbandType {
    pub const ALL: [WristbandType; 4] = [Self::Tyvek, Self::Vinyl, Self::Silicone, Self::Fabric];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Tyvek => "tyvek", Self::Vinyl => "vinyl", Self::Silicone => "silicone", Self::Fabric => "fabric" }
    }

    /// "Tyvek", "Silicone", ... for line items and emails.
    pub fn label(&self) -> &'static str {
        match self { Self::Tyvek => "Tyvek", Self::Vinyl => "Vinyl", Self::Silicone => "Silicone", Self::Fabric => "Fabric" }
    }
}

impl fmt::Display for WristbandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for WristbandType {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| UnknownVariant::new("wristband type", s))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintType {
    #[default]
    None,
    Black,
    FullColor,
}

impl PrintType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::None => "none", Self::Black => "black", Self::FullColor => "full_color" }
    }
    pub fn label(&self) -> Option<&'static str> {
        match self { Self::None => None, Self::Black => Some("Black Print"), Self::FullColor => Some("Full Color Print") }
    }
}

impl FromStr for PrintType {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(Self::None),
            "black" => Ok(Self::Black),
            "full_color" => Ok(Self::FullColor),
            _ => Err(UnknownVariant::new("print type", s)),
        }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: Currency }

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self { Self { amount, currency } }
    /// Amount in the currency's minor unit (cents/pence), as payment providers expect.
    pub fn minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_i64()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), round_cents(self.amount))
    }
}

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Ordered quantity of bands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Accepts `value` only if it meets `minimum`; never clamps.
    pub fn at_least(value: u32, minimum: u32) -> Result<Self, QuantityError> {
        if value < minimum { return Err(QuantityError::BelowMinimum { minimum, requested: value }); }
        Ok(Self(value))
    }
    /// Quantities read back from storage were validated when written.
    pub(crate) fn from_stored(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn thousands(&self) -> Decimal { Decimal::from(self.0) / Decimal::ONE_THOUSAND }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("Minimum quantity is {minimum} pieces")]
    BelowMinimum { minimum: u32, requested: u32 },
}

/// Named flat add-on fees stored on an order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraCharges(BTreeMap<String, Decimal>);

impl ExtraCharges {
    pub const TRADEMARK: &'static str = "trademark";
    pub const QR_CODE: &'static str = "qr_code";
    pub const EXPRESS: &'static str = "express";

    pub fn new() -> Self { Self::default() }

    /// Sets `name` to `amount`, replacing any previous value.
    pub fn set(&mut self, name: &str, amount: Decimal) { self.0.insert(name.to_string(), amount); }
    pub fn remove(&mut self, name: &str) -> Option<Decimal> { self.0.remove(name) }
    pub fn get(&self, name: &str) -> Option<Decimal> { self.0.get(name).copied() }
    pub fn total(&self) -> Decimal { self.0.values().copied().sum() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> { self.0.iter().map(|(k, v)| (k.as_str(), *v)) }
}

/// `unit_price * quantity + sum(extras)`, rounded to cents.
pub fn order_total(unit_price: Decimal, quantity: Quantity, extras: &ExtraCharges) -> Decimal {
    round_cents(unit_price * Decimal::from(quantity.value()) + extras.total())
}

/// Shipping destination captured at checkout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, validator::Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[validate(length(min = 1, message = "zip code is required"))]
    pub zip_code: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Raised when a stored or submitted string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant { pub kind: &'static str, pub value: String }

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self { Self { kind, value: value.to_string() } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_money_minor_units_and_display() {
        let m = Money::new(Decimal::new(7405, 2), Currency::Eur);
        assert_eq!(m.minor_units(), Some(7405));
        assert_eq!(m.to_string(), "€74.05");
        assert_eq!(Money::new(Decimal::new(1005, 3), Currency::Gbp).minor_units(), Some(101));
    }

    #[test]
    fn test_quantity_rejects_below_minimum() {
        assert_eq!(Quantity::at_least(999, 1000), Err(QuantityError::BelowMinimum { minimum: 1000, requested: 999 }));
        assert_eq!(Quantity::at_least(1000, 1000).unwrap().value(), 1000);
    }

    #[test]
    fn test_extra_charges_replace_not_accumulate() {
        let mut extras = ExtraCharges::new();
        extras.set(ExtraCharges::EXPRESS, Decimal::new(19, 0));
        extras.set(ExtraCharges::EXPRESS, Decimal::new(19, 0));
        extras.set(ExtraCharges::TRADEMARK, Decimal::new(15, 0));
        assert_eq!(extras.total(), Decimal::new(34, 0));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("silicone".parse::<WristbandType>().unwrap(), WristbandType::Silicone);
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("full_color".parse::<PrintType>().unwrap(), PrintType::FullColor);
        assert!("leather".parse::<WristbandType>().is_err());
    }

    #[test]
    fn test_shipping_address_requires_fields() {
        let mut addr = ShippingAddress { name: "Ada".into(), address: "1 Main St".into(), city: "Berlin".into(), state: None, zip_code: "10115".into(), country: "DE".into(), phone: None };
        assert!(addr.validate().is_ok());
        addr.zip_code.clear();
        assert!(addr.validate().is_err());
    }
}
