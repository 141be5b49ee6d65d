//! Ledger store port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory) implement this trait.

use crate::domain::{CurrencyCode, Money, NewUser, User, UserId, Wallet};
use crate::error::RepoError;

/// One side of a locked balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    Credit(Money),
    Debit(Money),
}

impl BalanceChange {
    pub fn currency(&self) -> CurrencyCode {
        match self {
            BalanceChange::Credit(m) | BalanceChange::Debit(m) => m.currency(),
        }
    }

    pub fn amount(&self) -> Money {
        match self {
            BalanceChange::Credit(m) | BalanceChange::Debit(m) => *m,
        }
    }
}

/// One entry of a compare-and-swap batch, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceWrite {
    pub currency: CurrencyCode,
    /// Balance the caller read
    pub expected: i64,
    /// Balance to store if `expected` still holds
    pub new: i64,
}

/// Storage of record for users and their per-currency wallets.
///
/// Balance mutations go through either [`LedgerStore::apply_locked`] or
/// [`LedgerStore::compare_and_swap`]; both are all-or-nothing across every
/// currency they touch.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a user together with a zero wallet per currency, atomically.
    ///
    /// Fails with `AlreadyExists` if the username is taken.
    async fn create_user(
        &self,
        user: NewUser,
        currencies: &[CurrencyCode],
    ) -> Result<User, RepoError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError>;

    async fn find_user_by_key_hash(&self, key_hash: &str) -> Result<Option<User>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Wallets
    // ─────────────────────────────────────────────────────────────────────────────

    /// Adds a zero wallet for an existing user. Idempotent.
    async fn provision_wallet(
        &self,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, RepoError>;

    async fn read_balance(
        &self,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Option<Wallet>, RepoError>;

    /// All of the user's wallets, ordered by currency.
    async fn read_all_balances(&self, user: UserId) -> Result<Vec<Wallet>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Mutations (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Whether [`LedgerStore::apply_locked`] is available.
    fn supports_transactions(&self) -> bool;

    /// Applies all changes in one transaction, locking rows in ascending
    /// currency order and checking sufficiency under the lock.
    async fn apply_locked(&self, user: UserId, changes: &[BalanceChange]) -> Result<(), RepoError> {
        let _ = (user, changes);
        Err(RepoError::Unsupported("apply_locked"))
    }

    /// Stores every `new` balance if every `expected` still matches, else
    /// changes nothing and returns `Conflict`.
    async fn compare_and_swap(&self, user: UserId, writes: &[BalanceWrite])
    -> Result<(), RepoError>;

    /// Quarantines a wallet; mutations touching it fail until repaired.
    async fn freeze_wallet(&self, user: UserId, currency: CurrencyCode) -> Result<(), RepoError>;
}
