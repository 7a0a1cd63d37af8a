use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces consecutive requests against one host.
///
/// Scraped portals block aggressive clients, so paginated adapters wait on
/// this before every page request.
#[derive(Clone)]
pub struct HostThrottle {
    limiter: Arc<DirectRateLimiter>,
}

impl HostThrottle {
    /// Allows at most one request per `interval`.
    pub fn per_interval(interval: Duration) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_for_interval(interval))),
        }
    }

    /// No spacing at all; used by tests and trusted endpoints.
    pub fn unthrottled() -> Self {
        Self::per_interval(Duration::ZERO)
    }

    /// Waits until the next request may be sent.
    pub async fn until_ready(&self) {
        self.limiter.until_ready().await;
    }

    #[cfg(test)]
    fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for HostThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostThrottle").finish_non_exhaustive()
    }
}

fn quota_for_interval(interval: Duration) -> Quota {
    let period = interval.max(Duration::from_millis(1));
    let burst = if interval.is_zero() {
        NonZeroU32::MAX
    } else {
        NonZeroU32::MIN
    };

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_within_interval_is_held_back() {
        let throttle = HostThrottle::per_interval(Duration::from_secs(60));
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn unthrottled_never_blocks() {
        let throttle = HostThrottle::unthrottled();
        for _ in 0..100 {
            assert!(throttle.try_acquire());
        }
    }

    #[tokio::test]
    async fn until_ready_returns_immediately_with_budget() {
        let throttle = HostThrottle::per_interval(Duration::from_millis(5));
        throttle.until_ready().await;
        throttle.until_ready().await;
    }
}
