//! PostgreSQL ledger store adapter.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use wallet_types::{
    BalanceChange, BalanceWrite, CurrencyCode, DomainError, LedgerStore, NewUser, RepoError,
    User, UserId, Wallet, WalletId,
};

use crate::types::{DbUser, DbWallet, db_err};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Store
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL store with row-level locking.
pub struct PostgresStore {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

impl PostgresStore {
    /// Creates a new PostgreSQL store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        execute_migration(
            &pool,
            include_str!("../migrations/0001_create_tables_pg.sql"),
            "0001",
        )
        .await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Sets a stored balance directly, bypassing every ledger check.
    ///
    /// For manual repair. Does not clear the frozen flag.
    pub async fn overwrite_balance(
        &self,
        user: UserId,
        currency: CurrencyCode,
        minor_units: i64,
    ) -> Result<(), RepoError> {
        sqlx::query(r#"UPDATE wallets SET balance = $1 WHERE user_id = $2 AND currency = $3"#)
            .bind(minor_units)
            .bind(user.to_string())
            .bind(currency.code())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, RepoError> {
        self.pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    /// Locks one wallet row for the rest of the transaction.
    async fn lock_wallet(
        tx: &mut Transaction<'_, Postgres>,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, RepoError> {
        let row: Option<DbWallet> = sqlx::query_as(
            r#"SELECT id, user_id, currency, balance, frozen FROM wallets
               WHERE user_id = $1 AND currency = $2 FOR UPDATE"#,
        )
        .bind(user.to_string())
        .bind(currency.code())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;

        row.ok_or(DomainError::WalletNotFound(currency))?
            .into_domain()
    }

    async fn store_balance(
        tx: &mut Transaction<'_, Postgres>,
        wallet: &Wallet,
    ) -> Result<(), RepoError> {
        sqlx::query(r#"UPDATE wallets SET balance = $1 WHERE id = $2"#)
            .bind(wallet.balance.amount())
            .bind(wallet.id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerStore for PostgresStore {
    async fn create_user(
        &self,
        user: NewUser,
        currencies: &[CurrencyCode],
    ) -> Result<User, RepoError> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"INSERT INTO users (id, username, email, api_key_hash, created_at) VALUES ($1, $2, $3, $4, $5)"#,
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
                r#"INSERT INTO wallets (id, user_id, currency, balance, frozen) VALUES ($1, $2, $3, 0, FALSE)"#,
            )
            .bind(WalletId::new().to_string())
            .bind(user.id.to_string())
            .bind(currency.code())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;
        Ok(user.to_user())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(r#"SELECT id, username, email, created_at FROM users WHERE id = $1"#)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn find_user_by_key_hash(&self, key_hash: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, username, email, created_at FROM users WHERE api_key_hash = $1"#,
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
            r#"INSERT INTO wallets (id, user_id, currency, balance, frozen) VALUES ($1, $2, $3, 0, FALSE)
               ON CONFLICT (user_id, currency) DO NOTHING"#,
        )
        .bind(WalletId::new().to_string())
        .bind(user.to_string())
        .bind(currency.code())
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
        let row: Option<DbWallet> = sqlx::query_as(
            r#"SELECT id, user_id, currency, balance, frozen FROM wallets
               WHERE user_id = $1 AND currency = $2"#,
        )
        .bind(user.to_string())
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbWallet::into_domain).transpose()
    }

    async fn read_all_balances(&self, user: UserId) -> Result<Vec<Wallet>, RepoError> {
        let rows: Vec<DbWallet> = sqlx::query_as(
            r#"SELECT id, user_id, currency, balance, frozen FROM wallets
               WHERE user_id = $1 ORDER BY currency"#,
        )
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

        // Locks are taken in ascending currency order so two exchanges in
        // opposite directions cannot deadlock.
        for change in &ordered {
            let mut wallet = Self::lock_wallet(&mut tx, user, change.currency()).await?;
            match change {
                BalanceChange::Debit(m) => wallet.debit(*m)?,
                BalanceChange::Credit(m) => wallet.credit(*m)?,
            }
            Self::store_balance(&mut tx, &wallet).await?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    async fn compare_and_swap(&self, user: UserId, writes: &[BalanceWrite]) -> Result<(), RepoError> {
        if writes.iter().any(|w| w.new < 0) {
            return Err(DomainError::NegativeAmount.into());
        }
        let mut ordered = writes.to_vec();
        ordered.sort_by_key(|w| w.currency);

        let mut tx = self.begin().await?;

        for write in &ordered {
            let result = sqlx::query(
                r#"UPDATE wallets SET balance = $1
                   WHERE user_id = $2 AND currency = $3 AND balance = $4 AND frozen = FALSE"#,
            )
            .bind(write.new)
            .bind(user.to_string())
            .bind(write.currency.code())
            .bind(write.expected)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                return Err(match self.read_balance(user, write.currency).await {
                    Ok(None) => DomainError::WalletNotFound(write.currency).into(),
                    Ok(Some(w)) if w.frozen => DomainError::WalletFrozen(write.currency).into(),
                    Ok(Some(_)) => RepoError::Conflict(format!(
                        "{} balance changed since it was read",
                        write.currency
                    )),
                    Err(e) => e,
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    async fn freeze_wallet(&self, user: UserId, currency: CurrencyCode) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE wallets SET frozen = TRUE WHERE user_id = $1 AND currency = $2"#,
        )
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
