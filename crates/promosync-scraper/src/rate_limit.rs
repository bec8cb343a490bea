//! Retry utilities for outbound requests.
//!
//! Every retriable failure is treated identically: there is no special
//! handling of 429 versus 5xx. The backoff is pure exponential with no jitter,
//! and the success-path throttle lives in [`crate::client::PromoClient`].

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Executes `operation` up to `max_attempts` times in total.
///
/// On success the result is returned immediately. After a failed attempt
/// with index `n` (starting at 0) the function sleeps
/// `backoff_base_secs * 2^n` seconds before the next attempt. The error of the
/// final attempt is returned unchanged.
///
/// # Backoff schedule (example with `backoff_base_secs = 1`, `max_attempts = 3`)
///
/// | Attempt | Sleep after failure |
/// |---------|---------------------|
/// | 0 | 1 s |
/// | 1 | 2 s |
/// | 2 | none, error returned |
///
/// A `max_attempts` of 0 is treated as 1. Non-retriable errors
/// ([`TransportError::InvalidUrl`], [`TransportError::ClientBuild`]) are
/// returned without sleeping.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retriable() || attempt + 1 >= max_attempts {
            return Err(err);
        }

        // Cap the shift so extreme configs saturate instead of overflowing.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_attempts,
            delay_secs,
            error = %err,
            "request failed, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> TransportError {
        TransportError::HttpStatus {
            status: 500,
            url: "https://example.com/list".to_owned(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, TransportError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds_on_third_attempt() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok::<u32, TransportError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_all_attempts() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, TransportError>(server_error())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(TransportError::HttpStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn treats_timeout_like_any_other_failure() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(TransportError::Timeout {
                        url: "https://example.com".to_owned(),
                    })
                } else {
                    Ok::<&str, TransportError>("ok")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(0, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, TransportError>(server_error())
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_invalid_url() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, TransportError>(TransportError::InvalidUrl {
                    url: "not a url".to_owned(),
                    reason: "relative URL without a base".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }
}
