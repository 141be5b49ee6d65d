//! Timeout and backoff helpers shared by the ledger and the exchange coordinator.

use std::future::Future;
use std::time::Duration;

use wallet_types::AppError;

/// Awaits `fut` for at most `limit`; expiry becomes `AppError::Timeout(what)`.
pub async fn bounded<T, E, F>(limit: Duration, what: &'static str, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<AppError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(AppError::Timeout(what)),
    }
}

/// Exponential backoff: `base * 2^attempt`, capped at one second.
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
        .min(Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_types::RepoError;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(10);
        assert_eq!(backoff(base, 0), Duration::from_millis(10));
        assert_eq!(backoff(base, 3), Duration::from_millis(80));
        assert_eq!(backoff(base, 30), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), AppError> = bounded(Duration::from_millis(10), "store", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, RepoError>(())
        })
        .await;
        assert!(matches!(result, Err(AppError::Timeout("store"))));
    }

    #[tokio::test]
    async fn test_bounded_maps_errors() {
        let result: Result<(), AppError> = bounded(Duration::from_secs(1), "store", async {
            Err(RepoError::Conflict("moved".into()))
        })
        .await;
        assert!(matches!(result, Err(AppError::StorageConflict(_))));
    }
}
