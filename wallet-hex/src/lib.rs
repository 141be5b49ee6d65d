//! # Wallet Hex
//!
//! Wallet core, HTTP adapter and rate source adapters.
//!
//! ## Architecture
//!
//! - `ledger` - the only writer of balances (locking or optimistic strategy)
//! - `exchange` - prices exchanges and hands them to the ledger
//! - `balance` - read-only balance snapshots
//! - `service` - facade the inbound adapter drives
//! - `inbound/` - HTTP adapter (Axum server)
//! - `outbound/` - rate source adapters
//!
//! Everything is generic over `S: LedgerStore` and `R: RateSource`, so
//! store and rate implementations are injected by the binary.

pub mod balance;
pub mod config;
pub mod exchange;
pub mod inbound;
pub mod ledger;
pub mod openapi;
pub mod outbound;
pub mod retry;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use config::{ExchangeConfig, LedgerConfig, Strategy};
pub use exchange::ExchangeOutcome;
pub use ledger::WalletLedger;
pub use outbound::{HttpRateSource, StaticRateSource};
pub use service::{Registration, WalletService};
