//! # Wallet Types
//!
//! Domain types and port traits for the multi-currency wallet service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Wallet, BalanceSnapshot, ExchangeQuote)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    BalanceSnapshot, CurrencyCode, ExchangeQuote, Money, NewUser, User, UserId, Wallet, WalletId,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{
    BalanceChange, BalanceWrite, ExchangeError, LedgerStore, RateSource,
};
pub use rust_decimal::Decimal;
