//! Fixed-quota rate limiting for provider calls.
//!
//! A limiter allows at most `max_calls` call starts per rolling `window` and at
//! most `max_in_flight` concurrent calls. Callers over quota wait in FIFO order;
//! nothing is ever rejected.

use crate::error::{Result, SourceError};
use partinfo_core::SourceConfig;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

/// Quota for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Calls allowed per window
    pub max_calls: u32,
    /// Rolling window length
    pub window: Duration,
    /// Concurrent calls allowed
    pub max_in_flight: u32,
}

impl RateLimit {
    /// Quota from a source's configuration.
    #[must_use]
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            max_calls: config.max_calls,
            window: config.window(),
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Permission to make one call. Dropping it frees the in-flight slot.
#[derive(Debug)]
pub struct RateLimitPermit {
    _in_flight: OwnedSemaphorePermit,
}

/// FIFO rate limiter shared by every caller of one provider.
#[derive(Debug)]
pub struct RateLimiter {
    limit: RateLimit,
    in_flight: Arc<Semaphore>,
    recent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter. Zero quotas are raised to one.
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        let limit = RateLimit {
            max_calls: limit.max_calls.max(1),
            max_in_flight: limit.max_in_flight.max(1),
            ..limit
        };
        Self {
            in_flight: Arc::new(Semaphore::new(limit.max_in_flight as usize)),
            recent: Mutex::new(VecDeque::with_capacity(limit.max_calls as usize)),
            limit,
        }
    }

    /// The enforced quota.
    #[must_use]
    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait for an in-flight slot and a window slot.
    ///
    /// # Errors
    /// Returns error only if the limiter has been torn down.
    pub async fn acquire(&self) -> Result<RateLimitPermit> {
        let in_flight = Arc::clone(&self.in_flight)
            .acquire_owned()
            .await
            .map_err(|_| SourceError::Internal("rate limiter closed".to_string()))?;

        // The lock is held while sleeping so later callers queue behind us.
        let mut recent = self.recent.lock().await;
        loop {
            let now = Instant::now();
            while recent
                .front()
                .is_some_and(|started| *started + self.limit.window <= now)
            {
                recent.pop_front();
            }

            if recent.len() < self.limit.max_calls as usize {
                recent.push_back(now);
                break;
            }

            if let Some(oldest) = recent.front().copied() {
                let ready_at = oldest + self.limit.window;
                debug!(
                    wait_ms = u64::try_from((ready_at - now).as_millis()).unwrap_or(u64::MAX),
                    "Rate limit reached, waiting"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        Ok(RateLimitPermit {
            _in_flight: in_flight,
        })
    }

    /// Run `call` under a permit. The permit is released when `call` finishes,
    /// whatever its outcome.
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(call.await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limiter(max_calls: u32, window_ms: u64, max_in_flight: u32) -> RateLimiter {
        RateLimiter::new(RateLimit {
            max_calls,
            window: Duration::from_millis(window_ms),
            max_in_flight,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_excess_calls_queue_in_order() {
        let limiter = limiter(2, 1000, 10);
        let start = Instant::now();
        let order = Mutex::new(Vec::new());

        let calls = (0..5).map(|i| {
            let limiter = &limiter;
            let order = &order;
            async move {
                limiter
                    .run(async {
                        order.lock().await.push(i);
                        Instant::now() - start
                    })
                    .await
                    .expect("permit")
            }
        });
        let started: Vec<Duration> = join_all(calls).await;

        let secs: Vec<u64> = started.iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![0, 0, 1, 1, 2]);
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_bound() {
        let limiter = limiter(100, 1000, 2);
        let current = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let calls = (0..6).map(|_| {
            limiter.run(async {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            })
        });
        let results = join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_released_on_drop() {
        let limiter = limiter(10, 1000, 1);
        {
            let _permit = limiter.acquire().await.expect("first permit");
        }
        let second = tokio::time::timeout(Duration::from_millis(1), limiter.acquire()).await;
        assert!(second.is_ok());
    }

    #[test]
    fn test_zero_quota_is_raised() {
        let limiter = limiter(0, 1000, 0);
        assert_eq!(limiter.limit().max_calls, 1);
        assert_eq!(limiter.limit().max_in_flight, 1);
    }
}
