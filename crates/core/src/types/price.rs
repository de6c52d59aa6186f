//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are decimals, never floats: a product priced at `19.99` must stay
//! exactly `19.99` all the way to the payment provider.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PriceError {
    /// The input is not a valid decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The parsed value is zero or negative.
    #[error("price must be greater than zero")]
    NotPositive,
}

/// A validated, strictly positive price.
///
/// Constructed via [`Price::parse`], which is the only way to obtain one, so
/// any `Price` held by the product store is known to be `> 0`.
///
/// ## Examples
///
/// ```
/// use clementine_core::Price;
///
/// assert!(Price::parse("19.99").is_ok());
/// assert!(Price::parse("0").is_err());
/// assert!(Price::parse("-5").is_err());
/// assert!(Price::parse("abc").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Parse a `Price` from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] if the input is not a decimal,
    /// or [`PriceError::NotPositive`] if it is zero or negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s).map_err(|_| PriceError::NotANumber)?;
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        Ok(Self(amount))
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let price = Price::parse("19.99").unwrap();
        assert_eq!(price.amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_parse_integer() {
        assert!(Price::parse("12").is_ok());
    }

    #[test]
    fn test_parse_zero_rejected() {
        assert!(matches!(Price::parse("0"), Err(PriceError::NotPositive)));
        assert!(matches!(Price::parse("0.00"), Err(PriceError::NotPositive)));
    }

    #[test]
    fn test_parse_negative_rejected() {
        assert!(matches!(Price::parse("-5"), Err(PriceError::NotPositive)));
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(matches!(Price::parse("abc"), Err(PriceError::NotANumber)));
        assert!(matches!(Price::parse(""), Err(PriceError::NotANumber)));
    }

    #[test]
    fn test_display() {
        let price = Price::parse("19.99").unwrap();
        assert_eq!(format!("{price}"), "19.99");
    }
}
