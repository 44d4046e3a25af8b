//! Bounded retry for top-level pipeline invocations
//!
//! Retries the whole dispatched phase on any error, capped both by attempt
//! count and by cumulative wall-clock time. Individual storage calls carry
//! no retry of their own; a failed attempt re-lists from storage and redoes
//! idempotent work.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, warn};

/// Maximum number of attempts for one pipeline invocation.
pub const MAX_ATTEMPTS: u32 = 7;

/// Cumulative wall-clock budget across all attempts.
pub const TOTAL_BUDGET: Duration = Duration::from_secs(300);

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Attempt and time limits for [`with_retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub total_budget: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            total_budget: TOTAL_BUDGET,
        }
    }
}

/// Run `op`, retrying on any error until it succeeds, `policy.max_attempts`
/// attempts have been made, or the cumulative elapsed time reaches
/// `policy.total_budget`, whichever comes first. The last error propagates.
///
/// Backoff between attempts is exponential and truncated so a sleep never
/// overruns the remaining budget.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let elapsed = started.elapsed();

                if attempt >= policy.max_attempts {
                    error!(
                        "Attempt {}/{} failed, giving up: {}",
                        attempt, policy.max_attempts, e
                    );
                    return Err(e);
                }
                if elapsed >= policy.total_budget {
                    error!(
                        "Attempt {} failed after {:?} (budget {:?} exhausted): {}",
                        attempt, elapsed, policy.total_budget, e
                    );
                    return Err(e);
                }

                let backoff = backoff_duration(attempt).min(policy.total_budget - elapsed);
                warn!(
                    "Attempt {}/{} failed: {}, retrying in {:?}",
                    attempt, policy.max_attempts, e, backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_op(
        calls: &AtomicU32,
        succeed_on: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, String>> + '_ {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= succeed_on {
                std::future::ready(Ok(n))
            } else {
                std::future::ready(Err(format!("failure {}", n)))
            }
        }
    }

    #[test]
    fn backoff_exponential() {
        assert_eq!(backoff_duration(1), Duration::from_secs(2));
        assert_eq!(backoff_duration(2), Duration::from_secs(4));
        assert_eq!(backoff_duration(3), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn first_attempt_success_does_not_retry() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::default(), counting_op(&calls, 1)).await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::default(), counting_op(&calls, 3)).await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::default(), counting_op(&calls, u32::MAX)).await;
        assert_eq!(result, Err("failure 7".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_budget_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 100,
            total_budget: Duration::from_secs(10),
        };
        let calls = AtomicU32::new(0);

        // Backoffs 2s + 4s, then the third backoff is truncated to the
        // remaining 4s; the fourth attempt starts with the budget spent.
        let result = with_retry(policy, counting_op(&calls, u32::MAX)).await;
        assert_eq!(result, Err("failure 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_attempt_limit_is_respected() {
        let policy = RetryPolicy {
            max_attempts: 2,
            total_budget: Duration::from_secs(300),
        };
        let calls = AtomicU32::new(0);
        let result = with_retry(policy, counting_op(&calls, u32::MAX)).await;
        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
