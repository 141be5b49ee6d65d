//! Rate source adapters: an in-process table and a remote HTTP service.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use exchange_rates::{RateError, RateTable};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use wallet_types::{CurrencyCode, ExchangeError, RateSource};

// ─────────────────────────────────────────────────────────────────────────────
// Static table
// ─────────────────────────────────────────────────────────────────────────────

/// Serves rates from a fixed [`RateTable`]. Used in development and tests.
#[derive(Debug, Clone)]
pub struct StaticRateSource {
    table: RateTable,
    base: CurrencyCode,
}

impl Default for StaticRateSource {
    fn default() -> Self {
        Self::new(RateTable::base())
    }
}

impl StaticRateSource {
    pub fn new(table: RateTable) -> Self {
        Self {
            table,
            base: CurrencyCode::USD,
        }
    }

    pub fn with_base(mut self, base: CurrencyCode) -> Self {
        self.base = base;
        self
    }

    fn lift(err: RateError, from: CurrencyCode, to: CurrencyCode) -> ExchangeError {
        match err {
            RateError::UnknownCurrency(code) => ExchangeError::UnsupportedCurrency(code),
            RateError::MissingRate(_) | RateError::NonPositiveRate(_) | RateError::Overflow(..) => {
                ExchangeError::RateNotAvailable(from, to)
            }
        }
    }
}

#[async_trait]
impl RateSource for StaticRateSource {
    async fn get_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, ExchangeError> {
        self.table
            .rate(from, to)
            .map_err(|e| Self::lift(e, from, to))
    }

    async fn convert(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        self.table
            .convert(amount, from, to)
            .map_err(|e| Self::lift(e, from, to))
    }

    async fn get_all_rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, ExchangeError> {
        self.table
            .all_rates(self.base)
            .map_err(|e| Self::lift(e, self.base, self.base))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote HTTP service
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RateBody {
    rate: Decimal,
}

#[derive(Debug, Deserialize)]
struct ConvertBody {
    converted_amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct RatesBody {
    rates: BTreeMap<String, Decimal>,
}

/// Client for a remote rate service exposing `/rate`, `/convert` and `/rates`.
///
/// Timeouts and retries are applied by the caller; the client only carries a
/// connect timeout so a dead host fails fast.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    base_url: String,
    http: Client,
}

impl HttpRateSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| ExchangeError::ServiceUnavailable(e.to_string()))?;
        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExchangeError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .map_err(|e| ExchangeError::ServiceUnavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(ExchangeError::ServiceUnavailable(format!(
                "{path} returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(ExchangeError::UnsupportedCurrency(format!(
                "{path} returned {status}"
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    #[tracing::instrument(skip(self))]
    async fn get_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, ExchangeError> {
        let body: RateBody = self
            .get(
                "/rate",
                &[("from", from.to_string()), ("to", to.to_string())],
            )
            .await?;
        if body.rate <= Decimal::ZERO {
            return Err(ExchangeError::InvalidResponse(format!(
                "non-positive rate {} for {from} -> {to}",
                body.rate
            )));
        }
        Ok(body.rate)
    }

    #[tracing::instrument(skip(self))]
    async fn convert(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<Decimal, ExchangeError> {
        let body: ConvertBody = self
            .get(
                "/convert",
                &[
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                    ("amount", amount.to_string()),
                ],
            )
            .await?;
        Ok(body.converted_amount)
    }

    #[tracing::instrument(skip(self))]
    async fn get_all_rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, ExchangeError> {
        let body: RatesBody = self.get("/rates", &[]).await?;

        // Currencies this deployment does not know are ignored.
        Ok(body
            .rates
            .into_iter()
            .filter_map(|(code, rate)| code.parse::<CurrencyCode>().ok().map(|c| (c, rate)))
            .collect())
    }
}
