//! SQLite ledger store adapter.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

use wallet_types::{
    BalanceChange, BalanceWrite, CurrencyCode, DomainError, LedgerStore, NewUser, RepoError,
    User, UserId, Wallet, WalletId,
};

use crate::types::{DbUser, DbWallet, db_err};

const WALLET_COLUMNS: &str = "id, user_id, currency, balance, frozen";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite store. Balance mutations run under SQLite's database write lock
/// using guarded conditional updates.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure on-disk SQLite target directory exists.
        if !in_memory {
            if let Some(path) = database_url.strip_prefix("sqlite://") {
                let path = path.split('?').next().unwrap_or(path);
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `:memory:` is a separate database.
        let max_connections = if in_memory { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema. Idempotent.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        for statement in ddl.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| RepoError::Database(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Sets a stored balance directly, bypassing every ledger check.
    ///
    /// For manual repair and tests. Does not clear the frozen flag.
    pub async fn overwrite_balance(
        &self,
        user: UserId,
        currency: CurrencyCode,
        minor_units: i64,
    ) -> Result<(), RepoError> {
        sqlx::query(r#"UPDATE wallets SET balance = ? WHERE user_id = ? AND currency = ?"#)
            .bind(minor_units)
            .bind(user.to_string())
            .bind(currency.code())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Sqlite>, RepoError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    async fn commit(tx: Transaction<'_, Sqlite>) -> Result<(), RepoError> {
        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    /// Explains why a guarded update touched no row.
    async fn diagnose(
        tx: &mut Transaction<'_, Sqlite>,
        user: UserId,
        change: &BalanceChange,
    ) -> RepoError {
        let currency = change.currency();
        let row: Result<Option<DbWallet>, _> = sqlx::query_as(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ? AND currency = ?"
        ))
        .bind(user.to_string())
        .bind(currency.code())
        .fetch_optional(&mut **tx)
        .await;

        let wallet = match row {
            Ok(Some(row)) => match row.into_domain() {
                Ok(wallet) => wallet,
                Err(e) => return e,
            },
            Ok(None) => return DomainError::WalletNotFound(currency).into(),
            Err(e) => return db_err(e),
        };

        if let Err(e) = wallet.ensure_active() {
            return e.into();
        }
        let mut probe = wallet;
        let outcome = match change {
            BalanceChange::Debit(m) => probe.debit(*m),
            BalanceChange::Credit(m) => probe.credit(*m),
        };
        match outcome {
            Err(e) => e.into(),
            Ok(()) => RepoError::Transaction(format!("{currency} wallet update was not applied")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn create_user(
        &self,
        user: NewUser,
        currencies: &[CurrencyCode],
    ) -> Result<User, RepoError> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"INSERT INTO users (id, username, email, api_key_hash, created_at) VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.api_key_hash)
        .bind(user.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for currency in currencies {
            sqlx::query(
                r#"INSERT INTO wallets (id, user_id, currency, balance, frozen) VALUES (?, ?, ?, 0, ?)"#,
            )
            .bind(WalletId::new().to_string())
            .bind(user.id.to_string())
            .bind(currency.code())
            .bind(false)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        Self::commit(tx).await?;
        Ok(user.to_user())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(r#"SELECT id, username, email, created_at FROM users WHERE id = ?"#)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn find_user_by_key_hash(&self, key_hash: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, username, email, created_at FROM users WHERE api_key_hash = ?"#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn provision_wallet(
        &self,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, RepoError> {
        if self.get_user(user).await?.is_none() {
            return Err(RepoError::NotFound);
        }

        sqlx::query(
            r#"INSERT INTO wallets (id, user_id, currency, balance, frozen) VALUES (?, ?, ?, 0, ?)
               ON CONFLICT (user_id, currency) DO NOTHING"#,
        )
        .bind(WalletId::new().to_string())
        .bind(user.to_string())
        .bind(currency.code())
        .bind(false)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        self.read_balance(user, currency)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn read_balance(
        &self,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Option<Wallet>, RepoError> {
        let row: Option<DbWallet> = sqlx::query_as(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ? AND currency = ?"
        ))
        .bind(user.to_string())
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbWallet::into_domain).transpose()
    }

    async fn read_all_balances(&self, user: UserId) -> Result<Vec<Wallet>, RepoError> {
        let rows: Vec<DbWallet> = sqlx::query_as(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ? ORDER BY currency"
        ))
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbWallet::into_domain).collect()
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    async fn apply_locked(&self, user: UserId, changes: &[BalanceChange]) -> Result<(), RepoError> {
        let mut ordered = changes.to_vec();
        ordered.sort_by_key(BalanceChange::currency);

        let mut tx = self.begin().await?;
        let user_id = user.to_string();

        for change in &ordered {
            let amount = change.amount().amount();
            let result = match change {
                BalanceChange::Debit(_) => {
                    sqlx::query(
                        r#"UPDATE wallets SET balance = balance - ?
                           WHERE user_id = ? AND currency = ? AND frozen = 0 AND balance >= ?"#,
                    )
                    .bind(amount)
                    .bind(&user_id)
                    .bind(change.currency().code())
                    .bind(amount)
                    .execute(&mut *tx)
                    .await
                }
                BalanceChange::Credit(_) => {
                    sqlx::query(
                        r#"UPDATE wallets SET balance = balance + ?
                           WHERE user_id = ? AND currency = ? AND frozen = 0 AND balance >= 0
                             AND balance <= ?"#,
                    )
                    .bind(amount)
                    .bind(&user_id)
                    .bind(change.currency().code())
                    .bind(i64::MAX - amount)
                    .execute(&mut *tx)
                    .await
                }
            }
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                // Dropping `tx` rolls back earlier updates.
                return Err(Self::diagnose(&mut tx, user, change).await);
            }
        }

        Self::commit(tx).await
    }

    async fn compare_and_swap(&self, user: UserId, writes: &[BalanceWrite]) -> Result<(), RepoError> {
        if writes.iter().any(|w| w.new < 0) {
            return Err(DomainError::NegativeAmount.into());
        }
        let mut ordered = writes.to_vec();
        ordered.sort_by_key(|w| w.currency);

        let mut tx = self.begin().await?;
        let user_id = user.to_string();

        for write in &ordered {
            let result = sqlx::query(
                r#"UPDATE wallets SET balance = ?
                   WHERE user_id = ? AND currency = ? AND balance = ? AND frozen = 0"#,
            )
            .bind(write.new)
            .bind(&user_id)
            .bind(write.currency.code())
            .bind(write.expected)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                let row: Option<DbWallet> = sqlx::query_as(&format!(
                    "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = ? AND currency = ?"
                ))
                .bind(&user_id)
                .bind(write.currency.code())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

                return Err(match row {
                    None => DomainError::WalletNotFound(write.currency).into(),
                    Some(row) if row.frozen => DomainError::WalletFrozen(write.currency).into(),
                    Some(_) => RepoError::Conflict(format!(
                        "{} balance changed since it was read",
                        write.currency
                    )),
                });
            }
        }

        Self::commit(tx).await
    }

    async fn freeze_wallet(&self, user: UserId, currency: CurrencyCode) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE wallets SET frozen = ? WHERE user_id = ? AND currency = ?"#)
                .bind(true)
                .bind(user.to_string())
                .bind(currency.code())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        tracing::warn!(user_id = %user, %currency, "wallet frozen");
        Ok(())
    }
}
