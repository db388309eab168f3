use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

/// Enforces a minimum spacing between consecutive requests.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            warn!(requests_per_second, "non-positive request rate, requests are not throttled");
            Duration::ZERO
        };
        Self::from_interval(min_interval)
    }

    pub fn from_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Sleep until `extra` beyond the minimum interval has passed since the
    /// previous call, then claim the slot.
    pub async fn wait_with(&self, extra: Duration) {
        let interval = self.min_interval + extra;
        let remaining = {
            let last = self.last_request.lock().unwrap_or_else(PoisonError::into_inner);
            last.and_then(|at| interval.checked_sub(at.elapsed()))
        };
        if let Some(remaining) = remaining.filter(|d| !d.is_zero()) {
            tokio::time::sleep(remaining).await;
        }
        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub async fn wait(&self) {
        self.wait_with(Duration::ZERO).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_call_is_immediate() {
        let limiter = RateLimiter::new(10.0);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn second_call_waits_for_interval() {
        let limiter = RateLimiter::new(10.0);
        limiter.wait().await;
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_rate_never_waits() {
        let limiter = RateLimiter::new(0.0);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(limiter.min_interval(), Duration::ZERO);
    }

    #[tokio::test]
    async fn extra_delay_stacks_on_interval() {
        let limiter = RateLimiter::from_interval(Duration::from_millis(40));
        limiter.wait().await;
        let start = Instant::now();
        limiter.wait_with(Duration::from_millis(60)).await;
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
