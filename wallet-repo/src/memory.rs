//! In-memory ledger store.
//!
//! Has no transactions: balance mutations go through compare-and-swap,
//! applied under a per-user lock so a batch is all-or-nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use wallet_types::{
    BalanceWrite, CurrencyCode, DomainError, LedgerStore, Money, NewUser, RepoError, User,
    UserId, Wallet, WalletId,
};

#[derive(Debug, Clone, Copy)]
struct MemWallet {
    id: WalletId,
    balance: i64,
    frozen: bool,
}

impl MemWallet {
    fn to_domain(self, user: UserId, currency: CurrencyCode) -> Result<Wallet, RepoError> {
        if self.balance < 0 {
            return Err(RepoError::NegativeBalance {
                currency,
                balance: self.balance,
            });
        }
        Ok(Wallet::from_parts(
            self.id,
            user,
            Money::new(self.balance, currency)?,
            self.frozen,
        ))
    }
}

type UserWallets = Arc<Mutex<BTreeMap<CurrencyCode, MemWallet>>>;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    usernames: DashMap<String, UserId>,
    key_hashes: DashMap<String, UserId>,
    wallets: DashMap<UserId, UserWallets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn user_wallets(&self, user: UserId) -> Option<UserWallets> {
        self.wallets.get(&user).map(|w| Arc::clone(w.value()))
    }

    /// Sets a stored balance directly, bypassing every ledger check.
    ///
    /// For manual repair and tests. Does not clear the frozen flag.
    pub async fn overwrite_balance(
        &self,
        user: UserId,
        currency: CurrencyCode,
        minor_units: i64,
    ) -> Result<(), RepoError> {
        let wallets = self.user_wallets(user).ok_or(RepoError::NotFound)?;
        let mut wallets = wallets.lock().await;
        let wallet = wallets.get_mut(&currency).ok_or(RepoError::NotFound)?;
        wallet.balance = minor_units;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn create_user(
        &self,
        user: NewUser,
        currencies: &[CurrencyCode],
    ) -> Result<User, RepoError> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(RepoError::AlreadyExists(format!(
                    "username '{}' is taken",
                    user.username
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        let wallets = currencies
            .iter()
            .map(|c| {
                (
                    *c,
                    MemWallet {
                        id: WalletId::new(),
                        balance: 0,
                        frozen: false,
                    },
                )
            })
            .collect();

        let public = user.to_user();
        self.wallets
            .insert(user.id, Arc::new(Mutex::new(wallets)));
        self.key_hashes.insert(user.api_key_hash, user.id);
        self.users.insert(user.id, public.clone());
        Ok(public)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_key_hash(&self, key_hash: &str) -> Result<Option<User>, RepoError> {
        let Some(id) = self.key_hashes.get(key_hash).map(|id| *id.value()) else {
            return Ok(None);
        };
        self.get_user(id).await
    }

    async fn provision_wallet(
        &self,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Wallet, RepoError> {
        let wallets = self.user_wallets(user).ok_or(RepoError::NotFound)?;
        let mut wallets = wallets.lock().await;
        let wallet = wallets.entry(currency).or_insert(MemWallet {
            id: WalletId::new(),
            balance: 0,
            frozen: false,
        });
        wallet.to_domain(user, currency)
    }

    async fn read_balance(
        &self,
        user: UserId,
        currency: CurrencyCode,
    ) -> Result<Option<Wallet>, RepoError> {
        let Some(wallets) = self.user_wallets(user) else {
            return Ok(None);
        };
        let wallets = wallets.lock().await;
        wallets
            .get(&currency)
            .map(|w| w.to_domain(user, currency))
            .transpose()
    }

    async fn read_all_balances(&self, user: UserId) -> Result<Vec<Wallet>, RepoError> {
        let Some(wallets) = self.user_wallets(user) else {
            return Ok(Vec::new());
        };
        let wallets = wallets.lock().await;
        wallets
            .iter()
            .map(|(currency, w)| w.to_domain(user, *currency))
            .collect()
    }

    fn supports_transactions(&self) -> bool {
        false
    }

    async fn compare_and_swap(&self, user: UserId, writes: &[BalanceWrite]) -> Result<(), RepoError> {
        if writes.iter().any(|w| w.new < 0) {
            return Err(DomainError::NegativeAmount.into());
        }
        let wallets = self
            .user_wallets(user)
            .ok_or_else(|| match writes.first() {
                Some(w) => RepoError::Domain(DomainError::WalletNotFound(w.currency)),
                None => RepoError::NotFound,
            })?;
        let mut wallets = wallets.lock().await;

        // Validate the whole batch before touching anything.
        for write in writes {
            let wallet = wallets
                .get(&write.currency)
                .ok_or(DomainError::WalletNotFound(write.currency))?;
            if wallet.frozen {
                return Err(DomainError::WalletFrozen(write.currency).into());
            }
            if wallet.balance != write.expected {
                return Err(RepoError::Conflict(format!(
                    "{} balance changed since it was read",
                    write.currency
                )));
            }
        }

        for write in writes {
            if let Some(wallet) = wallets.get_mut(&write.currency) {
                wallet.balance = write.new;
            }
        }
        Ok(())
    }

    async fn freeze_wallet(&self, user: UserId, currency: CurrencyCode) -> Result<(), RepoError> {
        let wallets = self.user_wallets(user).ok_or(RepoError::NotFound)?;
        let mut wallets = wallets.lock().await;
        let wallet = wallets.get_mut(&currency).ok_or(RepoError::NotFound)?;
        wallet.frozen = true;
        tracing::warn!(user_id = %user, %currency, "wallet frozen");
        Ok(())
    }
}
