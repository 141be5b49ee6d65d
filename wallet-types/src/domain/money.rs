//! Fixed-precision monetary value with embedded currency.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::CurrencyCode;
use crate::error::DomainError;

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (cents, kopecks, yen)
/// so balances never drift through binary floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: CurrencyCode,
}

impl Money {
    /// Creates a new Money value from minor units.
    pub fn new(amount: i64, currency: CurrencyCode) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self { amount, currency })
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Parses a decimal major-unit amount ("36.5" EUR -> 3650 cents).
    ///
    /// Rejects values carrying more precision than the currency's minor unit.
    pub fn from_decimal(value: Decimal, currency: CurrencyCode) -> Result<Self, DomainError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::NegativeAmount);
        }
        let places = currency.decimal_places();
        let normalized = value.normalize();
        if normalized.scale() > places {
            return Err(DomainError::InvalidAmount(format!(
                "{} supports at most {} decimal places, got {}",
                currency, places, value
            )));
        }
        let minor = normalized
            .checked_mul(Decimal::from(currency.minor_units_per_major()))
            .and_then(|m| m.to_i64())
            .ok_or(DomainError::Overflow)?;
        Self::new(minor, currency)
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Returns the amount in major units with the currency's scale.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.decimal_places())
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Checked addition - returns error if currencies don't match or the sum overflows.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(&other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(DomainError::Overflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// Checked subtraction - returns error if currencies don't match or result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(&other)?;
        if self.amount < other.amount {
            return Err(DomainError::InsufficientFunds {
                currency: self.currency,
                available: self.to_decimal(),
                requested: other.to_decimal(),
            });
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }

    /// Returns true if this Money covers `other` (same currency only).
    pub fn covers(&self, other: &Money) -> bool {
        self.currency == other.currency && self.amount >= other.amount
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.currency.symbol(), self.to_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_creation() {
        let money = Money::new(1000, CurrencyCode::USD).unwrap();
        assert_eq!(money.amount(), 1000);
        assert_eq!(money.currency(), CurrencyCode::USD);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100, CurrencyCode::USD);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_from_decimal() {
        let money = Money::from_decimal(dec!(36.5), CurrencyCode::EUR).unwrap();
        assert_eq!(money.amount(), 3650);
        assert_eq!(money.to_decimal(), dec!(36.50));

        let yen = Money::from_decimal(dec!(1500), CurrencyCode::JPY).unwrap();
        assert_eq!(yen.amount(), 1500);
    }

    #[test]
    fn test_from_decimal_trailing_zeros_accepted() {
        let money = Money::from_decimal(dec!(10.000), CurrencyCode::USD).unwrap();
        assert_eq!(money.amount(), 1000);
    }

    #[test]
    fn test_from_decimal_too_precise() {
        let result = Money::from_decimal(dec!(40.005), CurrencyCode::USD);
        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));

        let result = Money::from_decimal(dec!(1.5), CurrencyCode::JPY);
        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
    }

    #[test]
    fn test_from_decimal_negative() {
        let result = Money::from_decimal(dec!(-1), CurrencyCode::USD);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_money_addition() {
        let a = Money::new(100, CurrencyCode::USD).unwrap();
        let b = Money::new(50, CurrencyCode::USD).unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.amount(), 150);
    }

    #[test]
    fn test_money_addition_overflow() {
        let a = Money::new(i64::MAX, CurrencyCode::USD).unwrap();
        let b = Money::new(1, CurrencyCode::USD).unwrap();
        assert!(matches!(a.checked_add(b), Err(DomainError::Overflow)));
    }

    #[test]
    fn test_money_subtraction_insufficient() {
        let a = Money::new(100, CurrencyCode::USD).unwrap();
        let b = Money::new(150, CurrencyCode::USD).unwrap();
        assert!(matches!(
            a.checked_sub(b),
            Err(DomainError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::new(100, CurrencyCode::USD).unwrap();
        let eur = Money::new(50, CurrencyCode::EUR).unwrap();
        let result = usd.checked_add(eur);
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_money_display() {
        let money = Money::new(1050, CurrencyCode::USD).unwrap();
        assert_eq!(format!("{}", money), "$10.50");
    }
}
