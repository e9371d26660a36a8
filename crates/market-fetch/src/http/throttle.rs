//! Inter-request throttle
//!
//! One permit per period with a burst of one, so consecutive request starts
//! are at least `period` apart. Owned by a single client; no shared clock.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

pub struct Throttle {
    limiter: Option<DirectLimiter>,
    period: Duration,
}

impl Throttle {
    /// A zero period disables throttling
    pub fn new(period: Duration) -> Self {
        let limiter = Quota::with_period(period)
            .map(|q| q.allow_burst(NonZeroU32::MIN))
            .map(DirectLimiter::direct);
        Self { limiter, period }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the next request may start
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").field("period", &self.period).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_zero_period_disables() {
        let throttle = Throttle::disabled();
        assert!(!throttle.is_enabled());
    }

    #[tokio::test]
    async fn test_first_permit_is_immediate() {
        let throttle = Throttle::new(Duration::from_secs(5));
        let start = Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_consecutive_waits_are_spaced() {
        let period = Duration::from_millis(40);
        let throttle = Throttle::new(period);
        let start = Instant::now();
        for _ in 0..4 {
            throttle.wait().await;
        }
        // governor and std use different clocks; allow a millisecond of skew
        assert!(start.elapsed() + Duration::from_millis(1) >= period * 3);
    }
}
