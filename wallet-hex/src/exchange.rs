//! Exchange Coordinator
//!
//! Validates an exchange request, prices it against the rate source and hands
//! the two-sided balance change to the ledger.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use wallet_types::{
    AppError, BalanceSnapshot, CurrencyCode, ExchangeError, ExchangeQuote, LedgerStore, Money,
    RateSource, UserId,
};

use crate::config::ExchangeConfig;
use crate::ledger::WalletLedger;
use crate::retry::{backoff, bounded};

/// A completed exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub quote: ExchangeQuote,
    pub balances: BalanceSnapshot,
}

pub struct ExchangeCoordinator<S: LedgerStore, R: RateSource> {
    ledger: WalletLedger<S>,
    rates: Arc<R>,
    config: ExchangeConfig,
}

impl<S: LedgerStore, R: RateSource> ExchangeCoordinator<S, R> {
    pub fn new(ledger: WalletLedger<S>, rates: Arc<R>, config: ExchangeConfig) -> Self {
        Self {
            ledger,
            rates,
            config,
        }
    }

    /// Sells `amount` of `from` for `to` at the current rate.
    ///
    /// Balances are untouched unless the final ledger step commits.
    #[tracing::instrument(skip(self), fields(user_id = %user))]
    pub async fn exchange(
        &self,
        user: UserId,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<ExchangeOutcome, AppError> {
        let source = validate(from, to, amount)?;

        // Early, friendlier failure; the ledger re-checks under lock.
        let store = self.ledger.store();
        let wallet = bounded(
            self.ledger.config().store_timeout,
            "ledger store",
            store.read_balance(user, from),
        )
        .await?
        .ok_or(AppError::WalletNotFound(from))?;
        wallet.ensure_active()?;
        if !wallet.has_sufficient_funds(&source) {
            return Err(AppError::InsufficientFunds {
                currency: from,
                available: wallet.balance.to_decimal(),
                requested: source.to_decimal(),
            });
        }

        let rate = self.fetch_rate(from, to).await?;
        let quote = price(source, to, rate)?;

        let balances = self
            .ledger
            .apply_exchange(user, quote.source_amount, quote.converted_amount)
            .await?;

        tracing::info!(
            %from, %to, %rate,
            debited = %quote.source_amount,
            credited = %quote.converted_amount,
            "exchange committed"
        );
        Ok(ExchangeOutcome { quote, balances })
    }

    /// Prices an exchange without executing it. Never touches the store.
    #[tracing::instrument(skip(self))]
    pub async fn quote(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<ExchangeQuote, AppError> {
        let source = validate(from, to, amount)?;
        let rate = self.fetch_rate(from, to).await?;
        price(source, to, rate)
    }

    /// Current rates against the rate source's base currency.
    pub async fn rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, AppError> {
        let rates = Arc::clone(&self.rates);
        self.with_rate_retries("get_all_rates", || {
            let rates = Arc::clone(&rates);
            async move { rates.get_all_rates().await }
        })
        .await
    }

    async fn fetch_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, AppError> {
        let rates = Arc::clone(&self.rates);
        self.with_rate_retries("get_rate", || {
            let rates = Arc::clone(&rates);
            async move { rates.get_rate(from, to).await }
        })
        .await
    }

    /// Calls the rate source under `rate_timeout`, retrying transient
    /// failures `rate_retries` times with backoff.
    async fn with_rate_retries<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExchangeError>>,
    {
        let mut attempt = 0;
        loop {
            let failure = match tokio::time::timeout(self.config.rate_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_transient() => AppError::from(e),
                Ok(Err(e)) => {
                    tracing::warn!(op, error = %e, "rate source rejected request");
                    return Err(e.into());
                }
                Err(_) => AppError::Timeout("rate source"),
            };

            if attempt >= self.config.rate_retries {
                tracing::warn!(op, attempts = attempt + 1, error = %failure, "rate source failed");
                return Err(failure);
            }
            tracing::debug!(op, attempt, error = %failure, "rate source failed, retrying");
            tokio::time::sleep(backoff(self.config.rate_backoff, attempt)).await;
            attempt += 1;
        }
    }
}

/// Request-shape checks that need no IO.
fn validate(from: CurrencyCode, to: CurrencyCode, amount: Decimal) -> Result<Money, AppError> {
    if from == to {
        return Err(AppError::InvalidRequest(format!(
            "Cannot exchange {from} into itself"
        )));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidRequest(
            "Exchange amount must be greater than zero".into(),
        ));
    }
    Ok(Money::from_decimal(amount, from)?)
}

fn price(source: Money, to: CurrencyCode, rate: Decimal) -> Result<ExchangeQuote, AppError> {
    let quote = ExchangeQuote::price(source, to, rate)?;
    if quote.converted_amount.is_zero() {
        return Err(AppError::InvalidAmount(format!(
            "{source} is too small to convert into {to}"
        )));
    }
    Ok(quote)
}
