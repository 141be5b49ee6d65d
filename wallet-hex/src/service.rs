//! Wallet Application Service
//!
//! Orchestrates the ledger, exchange coordinator and balance view behind one
//! facade. Contains NO infrastructure logic - pure business orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use wallet_repo::security::{generate_api_key, hash_api_key};
use wallet_types::{
    AppError, BalanceSnapshot, CurrencyCode, ExchangeQuote, LedgerStore, Money, NewUser,
    RateSource, RepoError, User, UserId,
};

use crate::balance::BalanceView;
use crate::config::{ExchangeConfig, LedgerConfig};
use crate::exchange::{ExchangeCoordinator, ExchangeOutcome};
use crate::ledger::WalletLedger;
use crate::retry::bounded;

/// A freshly registered user. The raw key is never stored.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub api_key: String,
}

/// Application service for wallet operations.
///
/// Generic over the store and the rate source - both adapters are injected
/// at compile time. This enables:
/// - Swapping stores without code changes
/// - Testing with the in-memory store and fake rate sources
pub struct WalletService<S: LedgerStore, R: RateSource> {
    store: Arc<S>,
    ledger: WalletLedger<S>,
    exchange: ExchangeCoordinator<S, R>,
    view: BalanceView<S>,
}

impl<S: LedgerStore, R: RateSource> WalletService<S, R> {
    /// Creates a new wallet service with default configuration.
    pub fn new(store: S, rates: R) -> Self {
        Self::with_config(store, rates, LedgerConfig::default(), ExchangeConfig::default())
    }

    pub fn with_config(
        store: S,
        rates: R,
        ledger_config: LedgerConfig,
        exchange_config: ExchangeConfig,
    ) -> Self {
        let store = Arc::new(store);
        let store_timeout = ledger_config.store_timeout;
        let ledger = WalletLedger::new(Arc::clone(&store), ledger_config);
        let exchange = ExchangeCoordinator::new(ledger.clone(), Arc::new(rates), exchange_config);
        let view = BalanceView::new(Arc::clone(&store), store_timeout);

        Self {
            store,
            ledger,
            exchange,
            view,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &WalletLedger<S> {
        &self.ledger
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────────

    /// Registers a user with one empty wallet per supported currency.
    #[tracing::instrument(skip(self, email))]
    pub async fn register(&self, username: &str, email: &str) -> Result<Registration, AppError> {
        let api_key = generate_api_key();
        let new_user = NewUser::new(username, email, hash_api_key(&api_key))?;

        let user = bounded(
            self.ledger.config().store_timeout,
            "ledger store",
            async {
                match self.store.create_user(new_user, CurrencyCode::all()).await {
                    Err(RepoError::AlreadyExists(_)) => Err(RepoError::AlreadyExists(format!(
                        "Username '{}' is already taken",
                        username.trim()
                    ))),
                    other => other,
                }
            },
        )
        .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(Registration { user, api_key })
    }

    /// Resolves a raw API key to its owner.
    pub async fn authenticate(&self, raw_key: &str) -> Result<Option<UserId>, AppError> {
        let key_hash = hash_api_key(raw_key);
        let user = bounded(
            self.ledger.config().store_timeout,
            "ledger store",
            self.store.find_user_by_key_hash(&key_hash),
        )
        .await?;
        Ok(user.map(|u| u.id))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Balances
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn balance(&self, user: UserId) -> Result<BalanceSnapshot, AppError> {
        self.view.snapshot(user).await
    }

    /// Deposits a major-unit amount.
    pub async fn deposit(
        &self,
        user: UserId,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<BalanceSnapshot, AppError> {
        let amount = parse_amount(amount, currency)?;
        self.ledger.deposit(user, amount).await
    }

    /// Withdraws a major-unit amount.
    pub async fn withdraw(
        &self,
        user: UserId,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<BalanceSnapshot, AppError> {
        let amount = parse_amount(amount, currency)?;
        self.ledger.withdraw(user, amount).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Exchange
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn exchange(
        &self,
        user: UserId,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<ExchangeOutcome, AppError> {
        self.exchange.exchange(user, from, to, amount).await
    }

    pub async fn quote(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
    ) -> Result<ExchangeQuote, AppError> {
        self.exchange.quote(from, to, amount).await
    }

    pub async fn rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, AppError> {
        self.exchange.rates().await
    }
}

fn parse_amount(amount: Decimal, currency: CurrencyCode) -> Result<Money, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidAmount(
            "Amount must be greater than zero".into(),
        ));
    }
    Ok(Money::from_decimal(amount, currency)?)
}
