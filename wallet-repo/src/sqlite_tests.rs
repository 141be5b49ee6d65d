//! SQLite store integration tests.

#[cfg(test)]
mod tests {
    use wallet_types::{
        BalanceChange, BalanceWrite, CurrencyCode, DomainError, LedgerStore, Money, NewUser,
        RepoError, User, UserId,
    };

    use crate::SqliteStore;

    async fn setup_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    async fn register(store: &SqliteStore, name: &str) -> User {
        let new_user =
            NewUser::new(name, &format!("{name}@example.com"), format!("hash-{name}")).unwrap();
        store
            .create_user(new_user, CurrencyCode::all())
            .await
            .unwrap()
    }

    fn usd(minor: i64) -> Money {
        Money::new(minor, CurrencyCode::USD).unwrap()
    }

    fn eur(minor: i64) -> Money {
        Money::new(minor, CurrencyCode::EUR).unwrap()
    }

    async fn balance(store: &SqliteStore, user: UserId, currency: CurrencyCode) -> i64 {
        store
            .read_balance(user, currency)
            .await
            .unwrap()
            .unwrap()
            .balance
            .amount()
    }

    #[tokio::test]
    async fn test_create_user_provisions_all_wallets() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        let wallets = store.read_all_balances(user.id).await.unwrap();
        let currencies: Vec<_> = wallets.iter().map(|w| w.currency()).collect();

        assert_eq!(currencies, CurrencyCode::all().to_vec());
        assert!(wallets.iter().all(|w| w.balance.is_zero() && !w.frozen));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = setup_store().await;
        register(&store, "alice").await;

        let again = NewUser::new("alice", "other@example.com", "other-hash".into()).unwrap();
        let result = store.create_user(again, CurrencyCode::all()).await;

        assert!(matches!(result, Err(RepoError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_get_user_and_key_lookup() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        let fetched = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "alice");

        let by_key = store.find_user_by_key_hash("hash-alice").await.unwrap();
        assert_eq!(by_key.map(|u| u.id), Some(user.id));

        assert!(store.get_user(UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provision_wallet_is_idempotent() {
        let store = setup_store().await;
        let new_user = NewUser::new("bob", "bob@example.com", "hash-bob".into()).unwrap();
        let user = store.create_user(new_user, &[]).await.unwrap();

        let first = store
            .provision_wallet(user.id, CurrencyCode::GBP)
            .await
            .unwrap();
        let second = store
            .provision_wallet(user.id, CurrencyCode::GBP)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.read_all_balances(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provision_wallet_unknown_user() {
        let store = setup_store().await;
        let result = store.provision_wallet(UserId::new(), CurrencyCode::USD).await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_apply_locked_exchange() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        store
            .apply_locked(user.id, &[BalanceChange::Credit(usd(10_000))])
            .await
            .unwrap();
        store
            .apply_locked(
                user.id,
                &[
                    BalanceChange::Debit(usd(4_000)),
                    BalanceChange::Credit(eur(3_600)),
                ],
            )
            .await
            .unwrap();

        assert_eq!(balance(&store, user.id, CurrencyCode::USD).await, 6_000);
        assert_eq!(balance(&store, user.id, CurrencyCode::EUR).await, 3_600);
    }

    #[tokio::test]
    async fn test_apply_locked_insufficient_rolls_back() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        // EUR sorts first, so the credit is applied before the failing debit.
        let result = store
            .apply_locked(
                user.id,
                &[
                    BalanceChange::Debit(usd(100)),
                    BalanceChange::Credit(eur(90)),
                ],
            )
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InsufficientFunds {
                currency: CurrencyCode::USD,
                ..
            }))
        ));
        assert_eq!(balance(&store, user.id, CurrencyCode::EUR).await, 0);
    }

    #[tokio::test]
    async fn test_apply_locked_missing_wallet() {
        let store = setup_store().await;
        let new_user = NewUser::new("bob", "bob@example.com", "hash-bob".into()).unwrap();
        let user = store
            .create_user(new_user, &[CurrencyCode::USD])
            .await
            .unwrap();

        let result = store
            .apply_locked(user.id, &[BalanceChange::Credit(eur(1))])
            .await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::WalletNotFound(CurrencyCode::EUR)))
        ));
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        store
            .compare_and_swap(
                user.id,
                &[BalanceWrite {
                    currency: CurrencyCode::USD,
                    expected: 0,
                    new: 2_500,
                }],
            )
            .await
            .unwrap();
        assert_eq!(balance(&store, user.id, CurrencyCode::USD).await, 2_500);

        let stale = store
            .compare_and_swap(
                user.id,
                &[BalanceWrite {
                    currency: CurrencyCode::USD,
                    expected: 0,
                    new: 100,
                }],
            )
            .await;
        assert!(matches!(stale, Err(RepoError::Conflict(_))));
        assert_eq!(balance(&store, user.id, CurrencyCode::USD).await, 2_500);
    }

    #[tokio::test]
    async fn test_frozen_wallet_rejects_mutations() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        store.freeze_wallet(user.id, CurrencyCode::USD).await.unwrap();

        let locked = store
            .apply_locked(user.id, &[BalanceChange::Credit(usd(100))])
            .await;
        assert!(matches!(
            locked,
            Err(RepoError::Domain(DomainError::WalletFrozen(CurrencyCode::USD)))
        ));

        let swapped = store
            .compare_and_swap(
                user.id,
                &[BalanceWrite {
                    currency: CurrencyCode::USD,
                    expected: 0,
                    new: 100,
                }],
            )
            .await;
        assert!(matches!(
            swapped,
            Err(RepoError::Domain(DomainError::WalletFrozen(CurrencyCode::USD)))
        ));
    }

    #[tokio::test]
    async fn test_tampered_balance_surfaces_on_read() {
        let store = setup_store().await;
        let user = register(&store, "alice").await;

        store
            .overwrite_balance(user.id, CurrencyCode::GBP, -1)
            .await
            .unwrap();

        let result = store.read_all_balances(user.id).await;
        assert!(matches!(
            result,
            Err(RepoError::NegativeBalance {
                currency: CurrencyCode::GBP,
                balance: -1
            })
        ));
    }
}
