//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity must be at least 1")]
    NotPositive,
    #[error("quantity must be at most {max}")]
    TooLarge { max: u32 },
}

/// A positive quantity that fits the `cart_items.quantity` `INTEGER` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest storable quantity (`i32::MAX`).
    pub const MAX: u32 = 2_147_483_647;

    /// # Errors
    ///
    /// Returns an error for zero or for values above [`Quantity::MAX`].
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::NotPositive);
        }
        if value > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Value for binding to an `INTEGER` column.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // bounded by MAX
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_column_range() {
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
        assert_eq!(Quantity::new(Quantity::MAX).unwrap().as_i32(), i32::MAX);
    }

    #[test]
    fn test_new_rejects_zero_and_overflow() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive));
        assert_eq!(
            Quantity::try_from(Quantity::MAX + 1),
            Err(QuantityError::TooLarge { max: Quantity::MAX })
        );
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("5").unwrap().get(), 5);
    }
}
