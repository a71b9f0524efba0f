//! Bounded retry schedule shared by storage backends and the AI client.

use std::time::Duration;

/// Attempts, per-attempt timeout and exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each one after.
    pub base_delay: Duration,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the `retry`-th retry (1-based): base, 2×base, 4×base, ...
    pub fn delay_before(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Worst-case wall time: every attempt times out and every backoff is slept.
    pub fn budget(&self) -> Duration {
        let attempts = self.attempts();
        (1..attempts).fold(self.timeout.saturating_mul(attempts), |total, retry| {
            total.saturating_add(self.delay_before(retry))
        })
    }
}
