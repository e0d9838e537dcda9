use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tokio::sync::Mutex;

use crate::ValidationError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Process-wide pacer that keeps at least `min_interval` between upstream
/// request grants. The upstream ban policy is enforced entirely here: every
/// outbound call, including retries, must pass through [`RequestPacer::acquire`].
#[derive(Clone)]
pub struct RequestPacer {
    limiter: Arc<DirectRateLimiter>,
    turn: Arc<Mutex<()>>,
    min_interval: Duration,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Result<Self, ValidationError> {
        if min_interval.is_zero() {
            return Err(ValidationError::ZeroInterval);
        }

        let quota = Quota::with_period(min_interval)
            .expect("interval is non-zero")
            .allow_burst(NonZeroU32::new(1).expect("burst of one is non-zero"));

        Ok(Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            turn: Arc::new(Mutex::new(())),
            min_interval,
        })
    }

    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspends until the interval since the previous grant has elapsed and
    /// returns the time spent waiting. Concurrent callers are granted in FIFO
    /// order: the mutex queues waiters, so no caller can starve.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        let _turn = self.turn.lock().await;
        self.limiter.until_ready().await;
        started.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_zero_interval() {
        assert!(matches!(
            RequestPacer::new(Duration::ZERO),
            Err(ValidationError::ZeroInterval)
        ));
    }

    #[tokio::test]
    async fn successive_grants_respect_the_interval() {
        let interval = Duration::from_millis(30);
        let pacer = RequestPacer::new(interval).expect("pacer");

        pacer.acquire().await;
        let mut previous = Instant::now();
        for _ in 0..3 {
            pacer.acquire().await;
            let granted = Instant::now();
            assert!(
                granted.duration_since(previous) >= interval,
                "grants arrived closer than the minimum interval"
            );
            previous = granted;
        }
    }

    #[tokio::test]
    async fn concurrent_callers_are_each_spaced() {
        let interval = Duration::from_millis(20);
        let pacer = RequestPacer::new(interval).expect("pacer");
        let started = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = pacer.clone();
            handles.push(tokio::spawn(async move {
                pacer.acquire().await;
                Instant::now()
            }));
        }

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.expect("task"));
        }
        grants.sort();

        for pair in grants.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
        // Three grants need at least two full intervals from the start.
        assert!(started.elapsed() >= interval * 2);
    }
}
