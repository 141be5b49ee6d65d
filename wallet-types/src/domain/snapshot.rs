//! Point-in-time view of all of a user's balances.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::money::Money;
use super::wallet::Wallet;
use super::CurrencyCode;

/// Read-only mapping `currency -> amount` for one user.
///
/// Assembled fresh from the store on every request; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    balances: BTreeMap<CurrencyCode, Money>,
}

impl BalanceSnapshot {
    pub fn from_wallets<'a>(wallets: impl IntoIterator<Item = &'a Wallet>) -> Self {
        let balances = wallets
            .into_iter()
            .map(|w| (w.currency(), w.balance))
            .collect();
        Self { balances }
    }

    pub fn get(&self, currency: CurrencyCode) -> Option<Money> {
        self.balances.get(&currency).copied()
    }

    /// Balance in major units, `None` if no wallet exists for the currency.
    pub fn amount(&self, currency: CurrencyCode) -> Option<Decimal> {
        self.get(currency).map(|m| m.to_decimal())
    }

    pub fn iter(&self) -> impl Iterator<Item = (CurrencyCode, Money)> + '_ {
        self.balances.iter().map(|(c, m)| (*c, *m))
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Wire representation: currency code to decimal amount.
    pub fn to_decimal_map(&self) -> BTreeMap<CurrencyCode, Decimal> {
        self.iter().map(|(c, m)| (c, m.to_decimal())).collect()
    }
}

impl Serialize for BalanceSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.balances.len()))?;
        for (currency, money) in &self.balances {
            map.serialize_entry(currency, &money.to_decimal())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_from_wallets() {
        let user = UserId::new();
        let mut usd = Wallet::new(user, CurrencyCode::USD);
        usd.credit(Money::new(6000, CurrencyCode::USD).unwrap())
            .unwrap();
        let eur = Wallet::new(user, CurrencyCode::EUR);

        let snapshot = BalanceSnapshot::from_wallets(&[usd, eur]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.amount(CurrencyCode::USD), Some(dec!(60.00)));
        assert_eq!(snapshot.amount(CurrencyCode::EUR), Some(dec!(0)));
        assert_eq!(snapshot.amount(CurrencyCode::JPY), None);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = BalanceSnapshot::from_wallets(&[]);
        assert!(snapshot.is_empty());
    }
}
