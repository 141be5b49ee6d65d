//! Shared database row types for SQLite and PostgreSQL.
//!
//! Both schemas store ids and timestamps as TEXT so one set of rows serves
//! either backend.

use sqlx::FromRow;
use uuid::Uuid;

use wallet_types::{CurrencyCode, Money, RepoError, User, UserId, Wallet, WalletId};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// User row from database.
#[derive(FromRow)]
pub struct DbUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

/// Wallet row from database.
#[derive(FromRow)]
pub struct DbWallet {
    pub id: String,
    pub user_id: String,
    pub currency: String,
    pub balance: i64,
    pub frozen: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<CurrencyCode, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown currency: {}", s)))
}

fn parse_uuid(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

/// Maps driver errors, turning unique-key violations into `AlreadyExists`.
pub fn db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::AlreadyExists(db.message().to_string())
        }
        _ => RepoError::Database(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbUser {
    /// Convert database row to domain User.
    pub fn into_domain(self) -> Result<User, RepoError> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| RepoError::Database(e.to_string()))?
            .with_timezone(&chrono::Utc);

        Ok(User {
            id: UserId::from_uuid(parse_uuid(&self.id)?),
            username: self.username,
            email: self.email,
            created_at,
        })
    }
}

impl DbWallet {
    /// Convert database row to domain Wallet.
    ///
    /// A negative stored balance surfaces as `NegativeBalance` so the ledger
    /// can quarantine the wallet.
    pub fn into_domain(self) -> Result<Wallet, RepoError> {
        let currency = parse_currency(&self.currency)?;
        if self.balance < 0 {
            return Err(RepoError::NegativeBalance {
                currency,
                balance: self.balance,
            });
        }
        let balance = Money::new(self.balance, currency)?;

        Ok(Wallet::from_parts(
            WalletId::from_uuid(parse_uuid(&self.id)?),
            UserId::from_uuid(parse_uuid(&self.user_id)?),
            balance,
            self.frozen,
        ))
    }
}
