//! Fixed-point money amounts.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A non-negative monetary amount.
///
/// Prices, costs and invoice totals all use this type so that the
/// award → invoice → rating chain never accumulates binary rounding drift.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Validate and wrap an amount.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "amount must be non-negative (got {amount})"
            )));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Amount multiplied by a quantity (e.g. unit price × fulfilled quantity).
    ///
    /// Fails with Validation when the product exceeds the decimal range.
    pub fn times(&self, quantity: u32) -> DomainResult<Money> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(|| {
                DomainError::validation(format!("{self} × {quantity} exceeds the supported amount range"))
            })
    }

    /// Lossy conversion for numeric scoring. Only ranking/optimizer arithmetic uses this.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn negative_amounts_are_rejected() {
        let err = Money::new(Decimal::new(-1, 2)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(Money::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn times_is_exact() {
        let price = Money::new(Decimal::new(1010, 2)).unwrap(); // 10.10
        let total = price.times(3).unwrap();
        assert_eq!(total.amount(), Decimal::new(3030, 2));
        assert!((total.to_f64() - 30.3).abs() < 1e-9);
    }

    #[test]
    fn times_overflow_is_a_validation_error() {
        let huge = Money::new(Decimal::MAX).unwrap();
        assert!(matches!(huge.times(2), Err(DomainError::Validation(_))));
        assert_eq!(huge.times(1).unwrap(), huge);
        assert_eq!(huge.times(0).unwrap(), Money::ZERO);
    }
}
