//! WalletService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use wallet_repo::MemoryStore;
    use wallet_types::{
        AppError, BalanceChange, BalanceWrite, CurrencyCode, ExchangeError, LedgerStore, NewUser,
        RateSource, RepoError, User, UserId, Wallet,
    };

    use crate::config::{ExchangeConfig, LedgerConfig};
    use crate::WalletService;

    const USD: CurrencyCode = CurrencyCode::USD;
    const EUR: CurrencyCode = CurrencyCode::EUR;

    // ─────────────────────────────────────────────────────────────────────────
    // Test doubles
    // ─────────────────────────────────────────────────────────────────────────

    /// Memory store that counts every call made through the port.
    pub struct CountingStore {
        inner: MemoryStore,
        calls: Arc<AtomicUsize>,
    }

    impl CountingStore {
        pub fn new() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let store = Self {
                inner: MemoryStore::new(),
                calls: Arc::clone(&calls),
            };
            (store, calls)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl LedgerStore for CountingStore {
        async fn create_user(
            &self,
            user: NewUser,
            currencies: &[CurrencyCode],
        ) -> Result<User, RepoError> {
            self.tick();
            self.inner.create_user(user, currencies).await
        }

        async fn get_user(&self, id: UserId) -> Result<Option<User>, RepoError> {
            self.tick();
            self.inner.get_user(id).await
        }

        async fn find_user_by_key_hash(&self, key_hash: &str) -> Result<Option<User>, RepoError> {
            self.tick();
            self.inner.find_user_by_key_hash(key_hash).await
        }

        async fn provision_wallet(
            &self,
            user: UserId,
            currency: CurrencyCode,
        ) -> Result<Wallet, RepoError> {
            self.tick();
            self.inner.provision_wallet(user, currency).await
        }

        async fn read_balance(
            &self,
            user: UserId,
            currency: CurrencyCode,
        ) -> Result<Option<Wallet>, RepoError> {
            self.tick();
            self.inner.read_balance(user, currency).await
        }

        async fn read_all_balances(&self, user: UserId) -> Result<Vec<Wallet>, RepoError> {
            self.tick();
            self.inner.read_all_balances(user).await
        }

        fn supports_transactions(&self) -> bool {
            self.inner.supports_transactions()
        }

        async fn apply_locked(
            &self,
            user: UserId,
            changes: &[BalanceChange],
        ) -> Result<(), RepoError> {
            self.tick();
            self.inner.apply_locked(user, changes).await
        }

        async fn compare_and_swap(
            &self,
            user: UserId,
            writes: &[BalanceWrite],
        ) -> Result<(), RepoError> {
            self.tick();
            self.inner.compare_and_swap(user, writes).await
        }

        async fn freeze_wallet(&self, user: UserId, currency: CurrencyCode) -> Result<(), RepoError> {
            self.tick();
            self.inner.freeze_wallet(user, currency).await
        }
    }

    /// Same rate for every pair.
    pub struct FixedRate(pub Decimal);

    #[async_trait]
    impl RateSource for FixedRate {
        async fn get_rate(
            &self,
            _from: CurrencyCode,
            _to: CurrencyCode,
        ) -> Result<Decimal, ExchangeError> {
            Ok(self.0)
        }

        async fn convert(
            &self,
            _from: CurrencyCode,
            _to: CurrencyCode,
            amount: Decimal,
        ) -> Result<Decimal, ExchangeError> {
            Ok(amount * self.0)
        }

        async fn get_all_rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, ExchangeError> {
            Ok(CurrencyCode::all().iter().map(|&c| (c, self.0)).collect())
        }
    }

    /// Always fails with the given error and counts attempts.
    pub struct FailingRates {
        error: ExchangeError,
        calls: Arc<AtomicUsize>,
    }

    impl FailingRates {
        pub fn new(error: ExchangeError) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let rates = Self {
                error,
                calls: Arc::clone(&calls),
            };
            (rates, calls)
        }

        fn fail<T>(&self) -> Result<T, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(self.error.clone())
        }
    }

    #[async_trait]
    impl RateSource for FailingRates {
        async fn get_rate(
            &self,
            _from: CurrencyCode,
            _to: CurrencyCode,
        ) -> Result<Decimal, ExchangeError> {
            self.fail()
        }

        async fn convert(
            &self,
            _from: CurrencyCode,
            _to: CurrencyCode,
            _amount: Decimal,
        ) -> Result<Decimal, ExchangeError> {
            self.fail()
        }

        async fn get_all_rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, ExchangeError> {
            self.fail()
        }
    }

    /// Answers only after the given delay.
    pub struct SlowRates(pub Duration);

    #[async_trait]
    impl RateSource for SlowRates {
        async fn get_rate(
            &self,
            _from: CurrencyCode,
            _to: CurrencyCode,
        ) -> Result<Decimal, ExchangeError> {
            tokio::time::sleep(self.0).await;
            Ok(dec!(0.9))
        }

        async fn convert(
            &self,
            _from: CurrencyCode,
            _to: CurrencyCode,
            amount: Decimal,
        ) -> Result<Decimal, ExchangeError> {
            tokio::time::sleep(self.0).await;
            Ok(amount * dec!(0.9))
        }

        async fn get_all_rates(&self) -> Result<BTreeMap<CurrencyCode, Decimal>, ExchangeError> {
            tokio::time::sleep(self.0).await;
            Ok(BTreeMap::new())
        }
    }

    fn fast_exchange() -> ExchangeConfig {
        ExchangeConfig {
            rate_timeout: Duration::from_millis(50),
            rate_retries: 2,
            rate_backoff: Duration::from_millis(1),
        }
    }

    fn service<S: LedgerStore, R: RateSource>(store: S, rates: R) -> WalletService<S, R> {
        WalletService::with_config(store, rates, LedgerConfig::default(), fast_exchange())
    }

    async fn registered<S: LedgerStore, R: RateSource>(svc: &WalletService<S, R>) -> UserId {
        svc.register("alice", "alice@example.com")
            .await
            .unwrap()
            .user
            .id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_register_provisions_every_currency_at_zero() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(1)));
        let user = registered(&svc).await;

        let snapshot = svc.balance(user).await.unwrap();
        assert_eq!(snapshot.len(), CurrencyCode::all().len());
        assert!(snapshot.iter().all(|(_, m)| m.is_zero()));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(1)));
        registered(&svc).await;

        let result = svc.register("alice", "other@example.com").await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(1)));
        assert!(matches!(
            svc.register("al", "al@example.com").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.register("alice", "not-an-email").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_api_key_authenticates() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(1)));
        let registration = svc.register("alice", "alice@example.com").await.unwrap();

        assert!(registration.api_key.starts_with("wk_"));
        let resolved = svc.authenticate(&registration.api_key).await.unwrap();
        assert_eq!(resolved, Some(registration.user.id));
        assert_eq!(svc.authenticate("wk_nope").await.unwrap(), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deposits and withdrawals
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_deposit_rejects_non_positive_amount() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(1)));
        let user = registered(&svc).await;

        for amount in [dec!(0), dec!(-5)] {
            let result = svc.deposit(user, USD, amount).await;
            assert!(matches!(result, Err(AppError::InvalidAmount(_))));
        }
    }

    #[tokio::test]
    async fn test_deposit_rejects_sub_minor_precision() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(1)));
        let user = registered(&svc).await;

        let result = svc.deposit(user, USD, dec!(1.005)).await;
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Exchange
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_deposit_exchange_withdraw_scenario() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(0.9)));
        let user = registered(&svc).await;

        svc.deposit(user, USD, dec!(100)).await.unwrap();

        let outcome = svc.exchange(user, USD, EUR, dec!(40)).await.unwrap();
        assert_eq!(outcome.quote.converted_amount.to_decimal(), dec!(36.00));
        assert_eq!(outcome.balances.amount(USD), Some(dec!(60)));
        assert_eq!(outcome.balances.amount(EUR), Some(dec!(36)));

        let result = svc.withdraw(user, USD, dec!(70)).await;
        assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));

        let snapshot = svc.balance(user).await.unwrap();
        assert_eq!(snapshot.amount(USD), Some(dec!(60)));
        assert_eq!(snapshot.amount(EUR), Some(dec!(36)));
    }

    #[tokio::test]
    async fn test_same_currency_exchange_touches_nothing() {
        let (store, calls) = CountingStore::new();
        let svc = service(store, FixedRate(dec!(1)));

        let result = svc.exchange(UserId::new(), USD, USD, dec!(10)).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_quote_never_touches_store() {
        let (store, calls) = CountingStore::new();
        let svc = service(store, FixedRate(dec!(0.9)));

        let quote = svc.quote(USD, EUR, dec!(40)).await.unwrap();
        assert_eq!(quote.converted_amount.to_decimal(), dec!(36));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exchange_insufficient_funds_skips_rate_source() {
        let (rates, calls) = FailingRates::new(ExchangeError::ServiceUnavailable("down".into()));
        let svc = service(MemoryStore::new(), rates);
        let user = registered(&svc).await;

        let result = svc.exchange(user, USD, EUR, dec!(10)).await;
        assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_failure_leaves_balances_unchanged() {
        let (rates, calls) = FailingRates::new(ExchangeError::ServiceUnavailable("down".into()));
        let svc = service(MemoryStore::new(), rates);
        let user = registered(&svc).await;
        svc.deposit(user, USD, dec!(100)).await.unwrap();

        let result = svc.exchange(user, USD, EUR, dec!(40)).await;
        assert!(matches!(result, Err(AppError::RateUnavailable(_))));
        // first attempt plus two retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let snapshot = svc.balance(user).await.unwrap();
        assert_eq!(snapshot.amount(USD), Some(dec!(100)));
        assert_eq!(snapshot.amount(EUR), Some(dec!(0)));
    }

    #[tokio::test]
    async fn test_permanent_rate_error_is_not_retried() {
        let (rates, calls) = FailingRates::new(ExchangeError::RateNotAvailable(USD, EUR));
        let svc = service(MemoryStore::new(), rates);

        let result = svc.quote(USD, EUR, dec!(1)).await;
        assert!(matches!(result, Err(AppError::RateUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_timeout_leaves_balances_unchanged() {
        let svc = service(MemoryStore::new(), SlowRates(Duration::from_secs(5)));
        let user = registered(&svc).await;
        svc.deposit(user, USD, dec!(100)).await.unwrap();

        let result = svc.exchange(user, USD, EUR, dec!(40)).await;
        assert!(matches!(result, Err(AppError::Timeout(_))));

        let snapshot = svc.balance(user).await.unwrap();
        assert_eq!(snapshot.amount(USD), Some(dec!(100)));
        assert_eq!(snapshot.amount(EUR), Some(dec!(0)));
    }

    #[tokio::test]
    async fn test_conversion_too_small_is_rejected() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(0.001)));
        let user = registered(&svc).await;
        svc.deposit(user, USD, dec!(1)).await.unwrap();

        let result = svc.exchange(user, USD, EUR, dec!(0.01)).await;
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
        assert_eq!(
            svc.balance(user).await.unwrap().amount(USD),
            Some(dec!(1))
        );
    }

    #[tokio::test]
    async fn test_round_trip_never_gains() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(0.9)));
        let user = registered(&svc).await;
        svc.deposit(user, USD, dec!(10.01)).await.unwrap();

        let there = svc.exchange(user, USD, EUR, dec!(10.01)).await.unwrap();
        let back_rate = Decimal::ONE / dec!(0.9);
        let back = crate::exchange::ExchangeCoordinator::new(
            svc.ledger().clone(),
            Arc::new(FixedRate(back_rate)),
            fast_exchange(),
        )
        .exchange(user, EUR, USD, there.quote.converted_amount.to_decimal())
        .await
        .unwrap();

        let usd = back.balances.amount(USD).unwrap();
        assert!(usd <= dec!(10.01));
        assert!(usd >= Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_rates_pass_through() {
        let svc = service(MemoryStore::new(), FixedRate(dec!(2)));
        let rates = svc.rates().await.unwrap();
        assert_eq!(rates.len(), CurrencyCode::all().len());
        assert!(rates.values().all(|r| *r == dec!(2)));
    }
}
