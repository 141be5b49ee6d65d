//! Read-only balance queries.

use std::sync::Arc;
use std::time::Duration;

use wallet_types::{AppError, BalanceSnapshot, LedgerStore, UserId};

use crate::retry::bounded;

pub struct BalanceView<S: LedgerStore> {
    store: Arc<S>,
    store_timeout: Duration,
}

impl<S: LedgerStore> BalanceView<S> {
    pub fn new(store: Arc<S>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// All of the user's committed balances, read fresh.
    ///
    /// A known user without wallets gets an empty snapshot.
    #[tracing::instrument(skip(self), fields(user_id = %user))]
    pub async fn snapshot(&self, user: UserId) -> Result<BalanceSnapshot, AppError> {
        bounded(self.store_timeout, "ledger store", self.store.get_user(user))
            .await?
            .ok_or(AppError::UserNotFound)?;

        let wallets = bounded(
            self.store_timeout,
            "ledger store",
            self.store.read_all_balances(user),
        )
        .await?;
        Ok(BalanceSnapshot::from_wallets(&wallets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_repo::MemoryStore;
    use wallet_types::{CurrencyCode, NewUser};

    #[tokio::test]
    async fn test_unknown_user() {
        let view = BalanceView::new(Arc::new(MemoryStore::new()), Duration::from_secs(1));
        let result = view.snapshot(UserId::new()).await;
        assert!(matches!(result, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_user_without_wallets() {
        let store = MemoryStore::new();
        let user = NewUser::new("carol", "carol@example.com", "hash".into()).unwrap();
        let user = store.create_user(user, &[]).await.unwrap();

        let view = BalanceView::new(Arc::new(store), Duration::from_secs(1));
        assert!(view.snapshot(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_lists_every_wallet() {
        let store = MemoryStore::new();
        let user = NewUser::new("carol", "carol@example.com", "hash".into()).unwrap();
        let user = store
            .create_user(user, CurrencyCode::all())
            .await
            .unwrap();

        let view = BalanceView::new(Arc::new(store), Duration::from_secs(1));
        let snapshot = view.snapshot(user.id).await.unwrap();
        assert_eq!(snapshot.len(), CurrencyCode::all().len());
    }
}
