//! Retry policy for outbound transport failures.
//!
//! Only transport-level failures (connect errors, timeouts, HTTP 429/5xx) are
//! ever retried, and only when configured. A response that arrived but carried
//! no content, or a database error message, is final.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff for a single outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first. 1 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for each later attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: default_base_delay_ms(),
        }
    }

    /// A policy with the given attempt budget.
    pub fn with_attempts(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    /// Returns the attempt budget, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Returns true if another attempt may follow `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 1);
        assert!(!policy.allows_retry_after(1));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = RetryPolicy {
            max_attempts: 0,
            base_delay_ms: 10,
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::with_attempts(0, 10).max_attempts, 1);
    }

    #[test]
    fn test_exponential_delay() {
        let policy = RetryPolicy::with_attempts(3, 100);
        assert!(policy.allows_retry_after(1));
        assert!(policy.allows_retry_after(2));
        assert!(!policy.allows_retry_after(3));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }
}
