//! Service price using decimal arithmetic.
//!
//! Shops list their services with an optional price stored as `NUMERIC(10,2)`.
//! Prices are informational only; no payment flow reads them.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-negative price in the shop's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting negative amounts.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative()).then(|| Self(amount.round_dp(2)))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        assert!(Price::new(Decimal::new(-100, 2)).is_none());
        assert!(Price::new(Decimal::ZERO).is_some());
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_cents(2500).to_string(), "25.00");
        assert_eq!(
            Price::new(Decimal::new(19999, 3)).map(|p| p.to_string()),
            Some("20.00".to_string())
        );
    }
}
