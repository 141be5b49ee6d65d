//! Wallet Ledger
//!
//! The only component that mutates balances. Every mutation is all-or-nothing
//! across the wallets it touches. The account is checked for consistency
//! before the write and read back after it.

use std::future::Future;
use std::sync::Arc;

use wallet_types::{
    AppError, BalanceChange, BalanceSnapshot, BalanceWrite, CurrencyCode, LedgerStore, Money,
    RepoError, UserId,
};

use crate::config::{LedgerConfig, Strategy};
use crate::retry::backoff;

/// Balance mutations for one store.
///
/// Cheap to clone: the store is shared behind an `Arc`.
pub struct WalletLedger<S: LedgerStore> {
    store: Arc<S>,
    config: LedgerConfig,
    strategy: Strategy,
}

impl<S: LedgerStore> Clone for WalletLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            strategy: self.strategy,
        }
    }
}

impl<S: LedgerStore> WalletLedger<S> {
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Self {
        let strategy = match config.strategy {
            Strategy::Auto if store.supports_transactions() => Strategy::Locking,
            Strategy::Auto => Strategy::Optimistic,
            Strategy::Locking if !store.supports_transactions() => {
                tracing::warn!("store has no transactions, falling back to optimistic ledger");
                Strategy::Optimistic
            }
            explicit => explicit,
        };
        tracing::debug!(?strategy, "ledger strategy resolved");

        Self {
            store,
            config,
            strategy,
        }
    }

    /// The strategy in effect after resolving `Auto`.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Adds `amount` to the user's wallet in `amount`'s currency.
    #[tracing::instrument(skip_all, fields(user_id = %user, amount = %amount))]
    pub async fn deposit(&self, user: UserId, amount: Money) -> Result<BalanceSnapshot, AppError> {
        ensure_positive(&amount)?;
        self.run_detached(user, vec![BalanceChange::Credit(amount)])
            .await
    }

    /// Removes `amount` from the user's wallet; never overdraws.
    #[tracing::instrument(skip_all, fields(user_id = %user, amount = %amount))]
    pub async fn withdraw(&self, user: UserId, amount: Money) -> Result<BalanceSnapshot, AppError> {
        ensure_positive(&amount)?;
        self.run_detached(user, vec![BalanceChange::Debit(amount)])
            .await
    }

    /// Debits one wallet and credits another as a single atomic step.
    #[tracing::instrument(skip_all, fields(user_id = %user, debit = %debit, credit = %credit))]
    pub async fn apply_exchange(
        &self,
        user: UserId,
        debit: Money,
        credit: Money,
    ) -> Result<BalanceSnapshot, AppError> {
        ensure_positive(&debit)?;
        ensure_positive(&credit)?;
        if debit.currency() == credit.currency() {
            return Err(AppError::InvalidRequest(
                "Cannot exchange a currency into itself".into(),
            ));
        }

        self.run_detached(
            user,
            vec![BalanceChange::Debit(debit), BalanceChange::Credit(credit)],
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Commit path
    // ─────────────────────────────────────────────────────────────────────────────

    /// Runs the commit on its own task so a dropped caller cannot abandon it
    /// halfway.
    async fn run_detached(
        &self,
        user: UserId,
        changes: Vec<BalanceChange>,
    ) -> Result<BalanceSnapshot, AppError> {
        let ledger = self.clone();
        tokio::spawn(async move { ledger.commit(user, changes).await })
            .await
            .map_err(|e| AppError::Internal(format!("ledger commit task failed: {e}")))?
    }

    async fn commit(
        &self,
        user: UserId,
        changes: Vec<BalanceChange>,
    ) -> Result<BalanceSnapshot, AppError> {
        // A corrupt wallet anywhere halts the whole account before any write.
        self.call(user, self.store.read_all_balances(user)).await?;

        match self.strategy {
            Strategy::Optimistic => self.commit_optimistic(user, &changes).await?,
            Strategy::Locking | Strategy::Auto => {
                self.write(user, self.store.apply_locked(user, &changes))
                    .await?
            }
        }

        self.verified_snapshot(user).await
    }

    async fn commit_optimistic(
        &self,
        user: UserId,
        changes: &[BalanceChange],
    ) -> Result<(), AppError> {
        let max = self.config.max_conflict_retries;

        for attempt in 0..=max {
            let mut writes = Vec::with_capacity(changes.len());
            for change in changes {
                let currency = change.currency();
                let current = self
                    .call(user, self.store.read_balance(user, currency))
                    .await?
                    .ok_or(AppError::WalletNotFound(currency))?;

                let mut next = current.clone();
                match change {
                    BalanceChange::Debit(m) => next.debit(*m)?,
                    BalanceChange::Credit(m) => next.credit(*m)?,
                }
                writes.push(BalanceWrite {
                    currency,
                    expected: current.balance.amount(),
                    new: next.balance.amount(),
                });
            }

            match self
                .write(user, self.store.compare_and_swap(user, &writes))
                .await
            {
                Ok(()) => return Ok(()),
                Err(AppError::StorageConflict(reason)) if attempt < max => {
                    tracing::debug!(attempt, %reason, "compare-and-swap conflict, retrying");
                    tokio::time::sleep(backoff(self.config.conflict_backoff, attempt)).await;
                }
                Err(AppError::StorageConflict(reason)) => {
                    tracing::warn!(attempts = max + 1, %reason, "giving up after conflicts");
                    return Err(AppError::StorageConflict(format!(
                        "gave up after {} attempts: {reason}",
                        max + 1
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::StorageConflict("no attempts made".into()))
    }

    /// Reads every balance back after a committed write.
    ///
    /// The funds have already moved, so a failed read-back must not tell the
    /// caller to retry.
    async fn verified_snapshot(&self, user: UserId) -> Result<BalanceSnapshot, AppError> {
        match self.call(user, self.store.read_all_balances(user)).await {
            Ok(wallets) => Ok(BalanceSnapshot::from_wallets(&wallets)),
            Err(e @ AppError::ConsistencyViolation(_)) => Err(e),
            Err(e) => {
                tracing::error!(user_id = %user, error = %e, "read-back after commit failed");
                Err(AppError::Internal(format!(
                    "balance change committed but reading balances back failed: {e}"
                )))
            }
        }
    }

    /// Bounds a read by `store_timeout`; expiry is `Timeout`.
    async fn call<T, F>(&self, user: UserId, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Err(_) => Err(AppError::Timeout("ledger store")),
            Ok(result) => self.settle(user, result).await,
        }
    }

    /// Bounds a balance write by `store_timeout`. An expired write may or may
    /// not have committed, so expiry is reported as a non-retryable failure.
    async fn write<F>(&self, user: UserId, fut: F) -> Result<(), AppError>
    where
        F: Future<Output = Result<(), RepoError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Err(_) => {
                tracing::error!(user_id = %user, "balance write timed out, outcome unknown");
                Err(AppError::Internal(
                    "balance write timed out with unknown outcome; check balances before retrying"
                        .into(),
                ))
            }
            Ok(result) => self.settle(user, result).await,
        }
    }

    /// Turns a negative stored balance into a frozen wallet plus
    /// `ConsistencyViolation`.
    async fn settle<T>(&self, user: UserId, result: Result<T, RepoError>) -> Result<T, AppError> {
        match result {
            Ok(value) => Ok(value),
            Err(RepoError::NegativeBalance { currency, balance }) => {
                Err(self.quarantine(user, currency, balance).await)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn quarantine(&self, user: UserId, currency: CurrencyCode, balance: i64) -> AppError {
        tracing::error!(user_id = %user, %currency, balance, "negative balance detected");

        let frozen =
            tokio::time::timeout(self.config.store_timeout, self.store.freeze_wallet(user, currency))
                .await;
        match frozen {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(user_id = %user, %currency, error = %e, "failed to freeze wallet"),
            Err(_) => tracing::error!(user_id = %user, %currency, "timed out freezing wallet"),
        }

        AppError::ConsistencyViolation(format!(
            "{currency} balance is negative ({balance} minor units); wallet frozen"
        ))
    }
}

fn ensure_positive(amount: &Money) -> Result<(), AppError> {
    if amount.is_zero() {
        return Err(AppError::InvalidAmount(format!(
            "{} amount must be greater than zero",
            amount.currency()
        )));
    }
    Ok(())
}
