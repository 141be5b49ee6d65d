//! Explicit configuration for the wallet core.
//!
//! Built once by the binary and passed in at construction; nothing here reads
//! the environment.

use std::str::FromStr;
use std::time::Duration;

/// How balance mutations are made atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// `Locking` when the store has transactions, else `Optimistic`.
    #[default]
    Auto,
    /// Row locks inside one store transaction.
    Locking,
    /// Fresh read, then compare-and-swap with bounded retries.
    Optimistic,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Strategy::Auto),
            "locking" | "lock" => Ok(Strategy::Locking),
            "optimistic" | "cas" => Ok(Strategy::Optimistic),
            other => Err(format!(
                "unknown ledger strategy '{other}' (expected auto, locking or optimistic)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub strategy: Strategy,
    /// Upper bound on every individual store call.
    pub store_timeout: Duration,
    /// Compare-and-swap attempts after the first before giving up.
    pub max_conflict_retries: u32,
    /// First backoff delay; doubles per retry.
    pub conflict_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            store_timeout: Duration::from_secs(5),
            max_conflict_retries: 8,
            conflict_backoff: Duration::from_millis(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Upper bound on every rate source call.
    pub rate_timeout: Duration,
    /// Extra attempts for transient rate failures.
    pub rate_retries: u32,
    pub rate_backoff: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rate_timeout: Duration::from_secs(1),
            rate_retries: 2,
            rate_backoff: Duration::from_millis(50),
        }
    }
}
