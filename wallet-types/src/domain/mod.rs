//! Domain models for the wallet service.

pub mod money;
pub mod quote;
pub mod snapshot;
pub mod user;
pub mod wallet;

pub use exchange_rates::CurrencyCode;
pub use money::Money;
pub use quote::ExchangeQuote;
pub use snapshot::BalanceSnapshot;
pub use user::{NewUser, User, UserId};
pub use wallet::{Wallet, WalletId};
