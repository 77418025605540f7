//! Cart Aggregate
//!
//! A checkout cart holds one line per design the customer wants produced. A line
//! either points at an order created earlier (e.g. from the design studio) or
//! carries everything needed to create the design and the order at checkout.

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::aggregates::design::DesignDraft;
use crate::domain::aggregates::order::OrderOptions;
use crate::domain::value_objects::{Currency, PrintType, WristbandType};

/// Wire shape of a cart entry.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub design_id: Option<Uuid>,
    /// Rendered canvas as a `data:image/png;base64,...` URL.
    #[serde(default)]
    pub image_data_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub design: DesignDraft,
    #[serde(default)]
    pub item: Option<CartItem>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub quantity: u32,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub wristband_type: Option<WristbandType>,
    #[serde(default)]
    pub print_type: PrintType,
    #[serde(default)]
    pub has_trademark: bool,
    #[serde(default)]
    pub trademark_text: Option<String>,
    #[serde(default, alias = "hasSecureGuests")]
    pub has_qr_code: bool,
}

impl CartItem {
    pub fn options(&self) -> OrderOptions {
        OrderOptions {
            print_type: self.print_type,
            has_trademark: self.has_trademark,
            trademark_text: self.trademark_text.clone().filter(|_| self.has_trademark),
            has_qr_code: self.has_qr_code,
        }
    }
}

#[derive(Clone, Debug)]
pub enum DesignSource {
    Existing(Uuid),
    Upload { data_url: String, draft: DesignDraft },
    Hosted { url: String, draft: DesignDraft },
}

impl DesignSource {
    /// Fills in the draft's wristband type when the studio left it out.
    pub fn with_default_type(self, wristband_type: Option<WristbandType>) -> Self {
        match self {
            Self::Upload { data_url, mut draft } => {
                draft.wristband_type = draft.wristband_type.or(wristband_type);
                Self::Upload { data_url, draft }
            }
            Self::Hosted { url, mut draft } => {
                draft.wristband_type = draft.wristband_type.or(wristband_type);
                Self::Hosted { url, draft }
            }
            existing => existing,
        }
    }
}

#[derive(Clone, Debug)]
pub enum CartLine {
    Existing(Uuid),
    New { design: DesignSource, item: CartItem },
}

#[derive(Clone, Debug)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn from_entries(entries: Vec<CartEntry>) -> Result<Self, CartError> {
        if entries.is_empty() { return Err(CartError::Empty); }
        let mut lines: Vec<CartLine> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let line = match entry.order_id {
                Some(id) => CartLine::Existing(id),
                None => {
                    let item = entry.item.ok_or(CartError::MissingItem(index))?;
                    let design = match (entry.design_id, entry.image_data_url, entry.image_url) {
                        (Some(id), _, _) => DesignSource::Existing(id),
                        (None, Some(data_url), _) => DesignSource::Upload { data_url, draft: entry.design },
                        (None, None, Some(url)) => DesignSource::Hosted { url, draft: entry.design },
                        (None, None, None) => return Err(CartError::MissingDesign(index)),
                    };
                    CartLine::New { design, item }
                }
            };
            if let CartLine::Existing(id) = line {
                if lines.iter().any(|l| matches!(l, CartLine::Existing(other) if *other == id)) { continue; }
            }
            lines.push(line);
        }
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn into_lines(self) -> Vec<CartLine> { self.lines }
    pub fn item_count(&self) -> usize { self.lines.len() }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("No designs to checkout")]
    Empty,
    #[error("Cart entry {0} has neither an order nor order details")]
    MissingItem(usize),
    #[error("Cart entry {0} has no design image")]
    MissingDesign(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> CartItem {
        CartItem { quantity: 1000, currency: Currency::Eur, wristband_type: None, print_type: PrintType::None, has_trademark: false, trademark_text: Some("ACME".into()), has_qr_code: false }
    }

    #[test]
    fn test_cart_operations() {
        let existing = Uuid::now_v7();
        let cart = Cart::from_entries(vec![
            CartEntry { order_id: Some(existing), ..Default::default() },
            CartEntry { order_id: Some(existing), ..Default::default() },
            CartEntry { image_url: Some("https://cdn/a.png".into()), item: Some(item()), ..Default::default() },
        ]).unwrap();
        assert_eq!(cart.item_count(), 2); // Merged
        assert!(matches!(cart.lines()[1], CartLine::New { design: DesignSource::Hosted { .. }, .. }));
    }

    #[test]
    fn test_cart_rejects_incomplete_entries() {
        assert_eq!(Cart::from_entries(vec![]).unwrap_err(), CartError::Empty);
        assert_eq!(Cart::from_entries(vec![CartEntry::default()]).unwrap_err(), CartError::MissingItem(0));
        let no_design = CartEntry { item: Some(item()), ..Default::default() };
        assert_eq!(Cart::from_entries(vec![no_design]).unwrap_err(), CartError::MissingDesign(0));
    }

    #[test]
    fn test_trademark_text_dropped_without_trademark() {
        assert_eq!(item().options().trademark_text, None);
    }
}
