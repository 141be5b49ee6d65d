//! Error types for the wallet service.

use rust_decimal::Decimal;

use crate::domain::CurrencyCode;
use crate::ports::ExchangeError;

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch {
        expected: CurrencyCode,
        got: CurrencyCode,
    },

    #[error("Insufficient {currency} funds: available {available}, requested {requested}")]
    InsufficientFunds {
        currency: CurrencyCode,
        available: Decimal,
        requested: Decimal,
    },

    #[error("No {0} wallet for this user")]
    WalletNotFound(CurrencyCode),

    #[error("{0} wallet is frozen pending manual repair")]
    WalletFrozen(CurrencyCode),

    #[error("Amount overflows the supported range")]
    Overflow,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    /// A compare-and-swap lost the race; the caller may retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// A stored balance is below zero. Only reachable through out-of-band writes.
    #[error("Stored {currency} balance is negative: {balance}")]
    NegativeBalance { currency: CurrencyCode, balance: i64 },
}

/// Application-level errors surfaced to callers.
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No {0} wallet for this user")]
    WalletNotFound(CurrencyCode),

    #[error("User not found")]
    UserNotFound,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Insufficient {currency} funds: available {available}, requested {requested}")]
    InsufficientFunds {
        currency: CurrencyCode,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures that may succeed if the caller tries again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RateUnavailable(_) | AppError::Timeout(_) | AppError::StorageConflict(_)
        )
    }

    /// Stable variant name, used as the `kind` field of error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidAmount(_) => "InvalidAmount",
            AppError::InvalidRequest(_) => "InvalidRequest",
            AppError::BadRequest(_) => "BadRequest",
            AppError::WalletNotFound(_) => "WalletNotFound",
            AppError::UserNotFound => "UserNotFound",
            AppError::NotFound(_) => "NotFound",
            AppError::AlreadyExists(_) => "AlreadyExists",
            AppError::InsufficientFunds { .. } => "InsufficientFunds",
            AppError::RateUnavailable(_) => "RateUnavailable",
            AppError::Timeout(_) => "Timeout",
            AppError::StorageConflict(_) => "StorageConflict",
            AppError::ConsistencyViolation(_) => "ConsistencyViolation",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidAmount(msg) => AppError::InvalidAmount(msg),
            DomainError::NegativeAmount => {
                AppError::InvalidAmount("Amount cannot be negative".into())
            }
            DomainError::Overflow => AppError::InvalidAmount(err.to_string()),
            DomainError::InsufficientFunds {
                currency,
                available,
                requested,
            } => AppError::InsufficientFunds {
                currency,
                available,
                requested,
            },
            DomainError::WalletNotFound(currency) => AppError::WalletNotFound(currency),
            DomainError::WalletFrozen(_) => AppError::ConsistencyViolation(err.to_string()),
            DomainError::CurrencyMismatch { .. } => AppError::InvalidRequest(err.to_string()),
            DomainError::ValidationError(msg) => AppError::BadRequest(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::AlreadyExists(e) => AppError::AlreadyExists(e),
            RepoError::Conflict(e) => AppError::StorageConflict(e),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Unsupported(op) => AppError::Internal(format!("unsupported: {op}")),
            e @ RepoError::NegativeBalance { .. } => AppError::ConsistencyViolation(e.to_string()),
        }
    }
}

impl From<ExchangeError> for AppError {
    fn from(err: ExchangeError) -> Self {
        AppError::RateUnavailable(err.to_string())
    }
}
