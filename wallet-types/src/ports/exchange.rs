//! Exchange rate source port.
//!
//! Implementations can be HTTP clients, static tables, test doubles, etc.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::CurrencyCode;

/// Error type for exchange rate operations.
///
/// The wallet core treats every variant the same way; the detail is for logs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExchangeError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Rate not available for {0} -> {1}")]
    RateNotAvailable(CurrencyCode, CurrencyCode),

    #[error("Invalid response from rate service: {0}")]
    InvalidResponse(String),
}

impl ExchangeError {
    /// Whether asking again might give a different answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExchangeError::ServiceUnavailable(_) | ExchangeError::InvalidResponse(_)
        )
    }
}

/// Port trait for exchange rate providers.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync + 'static {
    /// How many units of `to` one unit of `from` buys.
    async fn get_rate(&self, from: CurrencyCode, to: CurrencyCode)
    -> Result<Decimal, ExchangeError>;

    /// Converts a major-unit amount. The result is not rounded.
    async fn convert(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<Decimal, ExchangeError>;

    /// Every known rate against the source's base currency.
    async fn get_all_rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, ExchangeError>;
}
