//! Retry of database work on transient lock contention
//!
//! Backoff starts at 10ms, doubles per attempt and is capped at 1000ms.
//! Total time spent retrying is bounded by `database_max_lock_wait_ms`.

use std::time::{Duration, Instant};

use clipscore_common::Result;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// `max_wait_ms` elapses
///
/// Each attempt must be a complete unit of work (typically one transaction),
/// since a failed attempt is retried from scratch. When the budget runs out
/// the last transient error is returned so callers can map it to a
/// retry-later response.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt: u32 = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_transient() => {
                let elapsed = start_time.elapsed();
                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Database still locked, giving up"
                    );
                    return Err(err);
                }

                let sleep_ms = backoff_ms.min(MAX_BACKOFF_MS);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = sleep_ms,
                    "Database locked, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipscore_common::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn locked_error() -> Error {
        Error::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let result = retry_on_lock("test_op", 1000, || async { Ok::<i32, Error>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_retries_until_lock_clears() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = retry_on_lock("test_op", 2000, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(locked_error())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<()> = retry_on_lock("test_op", 2000, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::SessionState("already validated".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::SessionState(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_with_transient_error_after_budget() {
        let result: Result<()> =
            retry_on_lock("test_op", 50, || async { Err(locked_error()) }).await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
    }
}
