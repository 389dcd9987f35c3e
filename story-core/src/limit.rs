//! Shared rate-limit budgets.
//!
//! A [`RateLimiter`] owns a fixed-window token budget shared by every
//! concurrent pipeline in the process. Acquiring a token blocks until one
//! is available; waiting past the configured maximum fails with
//! `RateLimited` instead of queueing forever.

use crate::error::StoryError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Bucket {
    tokens: u32,
    window_start: Instant,
}

/// Fixed-window token bucket, safe to share across tasks.
pub struct RateLimiter {
    budget: u32,
    window: Duration,
    max_wait: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// A limiter allowing `budget` acquisitions per `window`, with callers
    /// willing to wait up to `max_wait` for the next window.
    pub fn new(budget: u32, window: Duration, max_wait: Duration) -> Self {
        Self {
            budget,
            window,
            max_wait,
            bucket: Mutex::new(Bucket {
                tokens: budget,
                window_start: Instant::now(),
            }),
        }
    }

    /// Per-minute budget with a default 30 second maximum wait.
    pub fn per_minute(budget: u32) -> Self {
        Self::new(budget, Duration::from_secs(60), Duration::from_secs(30))
    }

    /// Consume one unit of budget, waiting for the window to roll over if
    /// the budget is spent.
    pub async fn acquire(&self) -> Result<(), StoryError> {
        let deadline = Instant::now() + self.max_wait;

        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();

                if now.duration_since(bucket.window_start) >= self.window {
                    bucket.tokens = self.budget;
                    bucket.window_start = now;
                }

                if bucket.tokens > 0 {
                    bucket.tokens -= 1;
                    return Ok(());
                }

                // Budget spent. Wait out the rest of the window.
                self.window - now.duration_since(bucket.window_start)
            };

            let now = Instant::now();
            if now + wait > deadline {
                debug!("rate budget exhausted past max wait");
                return Err(StoryError::rate_limited_after(self.max_wait));
            }
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_acquire_within_budget() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), Duration::from_millis(10));
        for _ in 0..3 {
            limiter.acquire().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_acquire_fails_past_max_wait() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), Duration::from_millis(20));
        limiter.acquire().await.unwrap();

        let err = limiter.acquire().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_acquire_refills_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(30), Duration::from_secs(5));
        limiter.acquire().await.unwrap();
        // Second acquisition must wait for the next window, not fail.
        limiter.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        let limiter = std::sync::Arc::new(RateLimiter::new(
            4,
            Duration::from_secs(60),
            Duration::from_millis(10),
        ));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(limiter.acquire().await.is_err());
    }
}
