//! # Retry Policy
//!
//! How many times, and how patiently, an idempotent storage operation is
//! retried after a transient failure.
//!
//! ```text
//! attempt 1 ──✗ wait 200ms ──► attempt 2 ──✗ wait 400ms ──► attempt 3 ──✗ give up
//!            (initial)                     (× multiplier, capped at max)
//! ```
//!
//! The policy is plain data. The executor lives in `reparto-db`, which
//! decides what counts as transient. Multi-statement transactions are never
//! handed to it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retrying.
    pub max_attempts: u32,
    /// Wait before the second attempt.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single wait.
    pub max_backoff_ms: u64,
    /// Growth factor between waits.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms.max(self.initial_backoff_ms))
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(2));
        assert!(!policy.allows_retry(3));
        assert_eq!(policy.initial_backoff(), Duration::from_millis(200));
    }

    #[test]
    fn test_none_never_retries() {
        assert!(!RetryPolicy::none().allows_retry(1));
        assert!(!RetryPolicy::default().with_max_attempts(0).allows_retry(1));
    }

    #[test]
    fn test_max_backoff_not_below_initial() {
        let policy = RetryPolicy {
            initial_backoff_ms: 500,
            max_backoff_ms: 100,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_backoff(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_toml_style_input_uses_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.max_backoff_ms, 2_000);
    }
}
