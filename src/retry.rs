//! Bounded retry and deadline helpers for calls to external collaborators.

use std::future::Future;
use tokio::time::{sleep, timeout, Duration};
use tracing::debug;

/// Run `f` up to `attempts` times, sleeping `delay * attempt` between tries.
///
/// Errors for which `should_retry` returns false are returned immediately.
pub async fn with_retry<F, Fut, T, E, P>(
    f: F,
    attempts: u32,
    delay: Duration,
    should_retry: P,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = attempts.max(1);
    let mut made = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                made += 1;
                if made >= attempts || !should_retry(&e) {
                    return Err(e);
                }
                debug!("Attempt {}/{} failed, retrying", made, attempts);
                sleep(delay.saturating_mul(made)).await;
            }
        }
    }
}

/// Await `fut` for at most `limit`, mapping expiry through `on_timeout`.
pub async fn with_deadline<Fut, T, E, M>(limit: Duration, fut: Fut, on_timeout: M) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    M: FnOnce(Duration) -> E,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("attempt {} failed", n))
                } else {
                    Ok(n)
                }
            },
            5,
            Duration::from_millis(1),
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down")
            },
            3,
            Duration::from_millis(1),
            |_| true,
        )
        .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("not found")
            },
            3,
            Duration::from_millis(1),
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_expiry() {
        let result: Result<(), String> = with_deadline(
            Duration::from_millis(10),
            async {
                sleep(Duration::from_millis(200)).await;
                Ok(())
            },
            |d| format!("expired after {}ms", d.as_millis()),
        )
        .await;

        assert_eq!(result, Err("expired after 10ms".to_string()));
    }
}
