//! Bounded retry with linear backoff around a single adapter call.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::listing_source::SourceResult;
use crate::ValidationError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Retry budget for one adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self, ValidationError> {
        if max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            base_delay,
        })
    }

    /// Single attempt, no sleeping.
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Sleep after the failed attempt `attempt` (1-based): `base_delay * attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Result of a retried call plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    pub result: SourceResult,
    pub attempts: u32,
}

/// Runs `call` until it returns `Ok`, a non-retryable error, or the policy's
/// attempt budget is exhausted. An `Ok` listing, partial or not, is returned
/// as is.
pub async fn with_retry<F, Fut>(mut call: F, policy: &RetryPolicy) -> RetryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult>,
{
    let mut attempt = 1;
    loop {
        let result = call().await;
        let error = match result {
            Ok(listing) => {
                return RetryOutcome {
                    result: Ok(listing),
                    attempts: attempt,
                }
            }
            Err(error) => error,
        };

        if !error.retryable() {
            debug!(attempt, code = error.code(), "not retrying: {}", error.message());
            return RetryOutcome {
                result: Err(error),
                attempts: attempt,
            };
        }
        if attempt >= policy.max_attempts {
            warn!(attempts = attempt, "giving up: {error}");
            return RetryOutcome {
                result: Err(error),
                attempts: attempt,
            };
        }

        let delay = policy.delay_for_attempt(attempt);
        warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, retrying: {error}"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::listing_source::{Listing, SourceError};
    use crate::{MarketSegment, SourceId};

    #[test]
    fn delay_grows_linearly_with_attempt_index() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        assert_eq!(
            RetryPolicy::new(0, Duration::ZERO),
            Err(ValidationError::ZeroAttempts)
        );
    }

    #[tokio::test]
    async fn transient_errors_use_every_attempt() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(4, Duration::ZERO).expect("valid policy");

        let outcome = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::transient("connection reset")) }
            },
            &policy,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.result.is_err());
    }

    #[tokio::test]
    async fn auth_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let outcome = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::auth("missing key")) }
            },
            &RetryPolicy::new(3, Duration::ZERO).expect("valid policy"),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let outcome = with_retry(
            || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(SourceError::malformed("html instead of json"))
                    } else {
                        Ok(Listing::new(SourceId::KrxCsv, MarketSegment::Korea, Vec::new()))
                    }
                }
            },
            &RetryPolicy::new(3, Duration::ZERO).expect("valid policy"),
        )
        .await;

        assert_eq!(outcome.attempts, 2);
        assert!(outcome.result.is_ok());
    }
}
