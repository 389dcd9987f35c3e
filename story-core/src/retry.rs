//! Retry policy for transient network failures.
//!
//! Both network-calling components (the content source adapter and the
//! generation client) share this policy: bounded attempts with exponential
//! backoff and jitter. Permanent failures are never retried; that
//! classification belongs to the caller.

use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Backoff delay before the retry following failed attempt number
    /// `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let capped = exp.min(self.max_delay);
        if !self.jitter || capped.is_zero() {
            return capped;
        }
        // Up to +50% jitter so concurrent pipelines spread out.
        let extra = rand::thread_rng().gen_range(0..=capped.as_millis() as u64 / 2);
        (capped + Duration::from_millis(extra)).min(self.max_delay)
    }
}
