//! Product cost and display price.
//!
//! Costs are stored as whole minor currency units (cents) in a `BIGINT`
//! column. [`Price`] turns an amount of cents into a decimal for display
//! and totals.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Cost`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    #[error("cost cannot be negative")]
    Negative,
    #[error("cost must be at most {max} cents")]
    TooLarge { max: i64 },
}

/// A product cost in minor currency units, between zero and [`Cost::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(i64);

impl Cost {
    /// Largest accepted cost: one billion in the standard unit.
    pub const MAX: i64 = 100_000_000_000;

    /// Create a cost from cents.
    ///
    /// # Errors
    ///
    /// Returns `CostError::Negative` for values below zero and
    /// `CostError::TooLarge` for values above [`Cost::MAX`].
    pub const fn new(cents: i64) -> Result<Self, CostError> {
        if cents < 0 {
            return Err(CostError::Negative);
        }
        if cents > Self::MAX {
            return Err(CostError::TooLarge { max: Self::MAX });
        }
        Ok(Self(cents))
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Display price for this cost.
    #[must_use]
    pub fn price(self) -> Price {
        Price::from_cents(self.0)
    }
}

/// A decimal price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (dollars, not cents).
    pub amount: Decimal,
}

impl Price {
    /// Build a price from an amount of cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self {
            amount: Decimal::new(cents, 2),
        }
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// Saturates at `Decimal::MAX` instead of overflowing.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self {
            amount: self.amount.saturating_mul(Decimal::from(quantity)),
        }
    }

    /// Sum of a sequence of prices, saturating like [`Price::times`].
    #[must_use]
    pub fn total(prices: impl IntoIterator<Item = Self>) -> Self {
        Self {
            amount: prices
                .into_iter()
                .fold(Decimal::ZERO, |sum, p| sum.saturating_add(p.amount)),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_bounds() {
        assert_eq!(Cost::new(1250).unwrap().cents(), 1250);
        assert_eq!(Cost::new(0).unwrap().cents(), 0);
        assert_eq!(Cost::new(Cost::MAX).unwrap().cents(), Cost::MAX);
        assert_eq!(Cost::new(-1), Err(CostError::Negative));
        assert_eq!(
            Cost::new(Cost::MAX + 1),
            Err(CostError::TooLarge { max: Cost::MAX })
        );
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_cents(1250).to_string(), "$12.50");
        assert_eq!(Price::from_cents(5).to_string(), "$0.05");
        assert_eq!(Cost::new(0).unwrap().price().to_string(), "$0.00");
    }

    #[test]
    fn test_price_times_and_total() {
        let line = Price::from_cents(399).times(3);
        assert_eq!(line.to_string(), "$11.97");

        let total = Price::total([line, Price::from_cents(3)]);
        assert_eq!(total.to_string(), "$12.00");
        assert_eq!(Price::total(std::iter::empty()).to_string(), "$0.00");
    }

    #[test]
    fn test_large_cart_totals_do_not_overflow() {
        let line = Cost::new(Cost::MAX).unwrap().price().times(u32::MAX);
        let total = Price::total(std::iter::repeat_n(line, 64));
        assert!(total.amount > line.amount);

        let saturated = Price::from_cents(i64::MAX).times(u32::MAX);
        let total = Price::total(std::iter::repeat_n(saturated, 1_000_000));
        assert_eq!(total.amount, Decimal::MAX);
    }
}
