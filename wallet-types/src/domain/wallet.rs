//! Wallet (per-currency account balance) domain model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use super::user::UserId;
use super::CurrencyCode;
use crate::error::DomainError;

/// Unique identifier for a Wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    /// Creates a new random WalletId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a WalletId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WalletId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WalletId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One user's balance in one currency.
///
/// There is at most one wallet per (user, currency) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique identifier
    pub id: WalletId,
    /// Owner
    pub user_id: UserId,
    /// Current balance (includes currency information)
    pub balance: Money,
    /// Set when the wallet is quarantined after a consistency violation
    pub frozen: bool,
}

impl Wallet {
    /// Creates an empty wallet for a user.
    pub fn new(user_id: UserId, currency: CurrencyCode) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            balance: Money::zero(currency),
            frozen: false,
        }
    }

    /// Creates a wallet with all fields specified (for database reconstruction).
    pub fn from_parts(id: WalletId, user_id: UserId, balance: Money, frozen: bool) -> Self {
        Self {
            id,
            user_id,
            balance,
            frozen,
        }
    }

    /// Returns the currency of this wallet.
    pub fn currency(&self) -> CurrencyCode {
        self.balance.currency()
    }

    /// Credits (adds) money to the wallet.
    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.balance = self.balance.checked_add(amount)?;
        Ok(())
    }

    /// Debits (subtracts) money from the wallet.
    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.balance = self.balance.checked_sub(amount)?;
        Ok(())
    }

    /// Checks if the wallet has sufficient funds for a debit.
    pub fn has_sufficient_funds(&self, amount: &Money) -> bool {
        self.balance.covers(amount)
    }

    /// Fails with `WalletFrozen` if the wallet is quarantined.
    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if self.frozen {
            return Err(DomainError::WalletFrozen(self.currency()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(amount: i64) -> Money {
        Money::new(amount, CurrencyCode::USD).unwrap()
    }

    #[test]
    fn test_wallet_creation() {
        let user = UserId::new();
        let wallet = Wallet::new(user, CurrencyCode::USD);
        assert_eq!(wallet.user_id, user);
        assert_eq!(wallet.balance.amount(), 0);
        assert_eq!(wallet.currency(), CurrencyCode::USD);
        assert!(!wallet.frozen);
    }

    #[test]
    fn test_wallet_credit_and_debit() {
        let mut wallet = Wallet::new(UserId::new(), CurrencyCode::USD);
        wallet.credit(usd(1000)).unwrap();
        wallet.debit(usd(300)).unwrap();
        assert_eq!(wallet.balance.amount(), 700);
    }

    #[test]
    fn test_insufficient_funds() {
        let mut wallet = Wallet::new(UserId::new(), CurrencyCode::USD);
        wallet.credit(usd(100)).unwrap();
        let result = wallet.debit(usd(200));
        assert!(matches!(result, Err(DomainError::InsufficientFunds { .. })));
        assert_eq!(wallet.balance.amount(), 100);
    }

    #[test]
    fn test_credit_wrong_currency() {
        let mut wallet = Wallet::new(UserId::new(), CurrencyCode::EUR);
        let result = wallet.credit(usd(100));
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_frozen_wallet_rejects_mutation() {
        let mut wallet = Wallet::new(UserId::new(), CurrencyCode::USD);
        wallet.frozen = true;
        assert!(matches!(
            wallet.credit(usd(1)),
            Err(DomainError::WalletFrozen(CurrencyCode::USD))
        ));
    }
}
