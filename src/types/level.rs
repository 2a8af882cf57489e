//! Parsed price levels.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::Error;

use super::Quantity;

/// A single `[price, quantity]` pair as sent by the exchange
pub type RawLevel = [String; 2];

/// A validated price level.
///
/// The price keeps its exact wire text, which is what the book keys on, so
/// `"100.50"` and `"100.5"` are distinct levels just as they are distinct
/// strings on the wire. The parsed [`Decimal`] is carried alongside and used
/// only for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    /// Price exactly as received
    pub price: String,
    /// Parsed price, for sorting
    pub value: Decimal,
    /// Quantity at this price (zero means "remove the level")
    pub quantity: Quantity,
}

impl PriceLevel {
    /// Parse a level from its wire text
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedLevel`] if the price is not a decimal, or the
    /// quantity is not a finite, non-negative number.
    pub fn parse(price: &str, quantity: &str) -> Result<Self, Error> {
        let malformed = |reason| Error::MalformedLevel {
            price: price.to_string(),
            quantity: quantity.to_string(),
            reason,
        };

        let value = Decimal::from_str(price).map_err(|_| malformed("price is not a decimal"))?;
        let qty: f64 = quantity
            .parse()
            .map_err(|_| malformed("quantity is not a number"))?;
        if !qty.is_finite() || qty < 0.0 {
            return Err(malformed("quantity must be finite and non-negative"));
        }

        Ok(Self {
            price: price.to_string(),
            value,
            quantity: qty,
        })
    }

    /// Whether this level deletes its price from the book
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.quantity == 0.0
    }
}

impl TryFrom<&RawLevel> for PriceLevel {
    type Error = Error;

    fn try_from(raw: &RawLevel) -> Result<Self, Self::Error> {
        Self::parse(&raw[0], &raw[1])
    }
}

/// Parse a whole side of a message, failing on the first bad level
pub(crate) fn parse_levels(raw: &[RawLevel]) -> Result<Vec<PriceLevel>, Error> {
    raw.iter().map(PriceLevel::try_from).collect()
}
