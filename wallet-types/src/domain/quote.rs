//! Exchange quote domain model.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::CurrencyCode;
use crate::error::DomainError;

/// A priced conversion of `source_amount` into `to` at `rate`.
///
/// Quotes are ephemeral - they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `to` per unit of `from`
    pub rate: Decimal,
    pub source_amount: Money,
    pub converted_amount: Money,
}

impl ExchangeQuote {
    /// Prices `source` into `to`.
    ///
    /// The converted amount is rounded down to the target's minor unit so an
    /// exchange can never create value.
    pub fn price(source: Money, to: CurrencyCode, rate: Decimal) -> Result<Self, DomainError> {
        if rate <= Decimal::ZERO {
            return Err(DomainError::ValidationError(format!(
                "Exchange rate must be positive, got {}",
                rate
            )));
        }

        let converted = source
            .to_decimal()
            .checked_mul(rate)
            .ok_or(DomainError::Overflow)?
            .round_dp_with_strategy(to.decimal_places(), RoundingStrategy::ToZero);

        Ok(Self {
            from: source.currency(),
            to,
            rate,
            source_amount: source,
            converted_amount: Money::from_decimal(converted, to)?,
        })
    }
}
