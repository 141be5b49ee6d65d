//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The wallet core depends on these traits, not concrete implementations.

mod exchange;
mod repository;

pub use exchange::{ExchangeError, RateSource};
pub use repository::{BalanceChange, BalanceWrite, LedgerStore};
