//! Backoff for rate-limited dispatches

use std::time::Duration;

use tracing::debug;

/// What to do with a rate-limited descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue after `delay`
    Retry { delay: Duration },

    /// Retries exhausted, fail the request
    Exhausted,
}

/// Computes backoff and decides whether another attempt is allowed
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Server-suggested delay if given, else `base * 2^retry_count`
    pub fn delay(&self, retry_count: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(after) = retry_after {
            return after;
        }
        let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Decide for a descriptor that has already been retried `retry_count` times
    pub fn decide(&self, retry_count: u32, retry_after: Option<Duration>) -> RetryDecision {
        if retry_count < self.max_retries {
            let delay = self.delay(retry_count, retry_after);
            debug!(retry_count, delay_ms = delay.as_millis() as u64, "RetryPolicy::decide: retry");
            RetryDecision::Retry { delay }
        } else {
            debug!(retry_count, max_retries = self.max_retries, "RetryPolicy::decide: exhausted");
            RetryDecision::Exhausted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay(0, None), Duration::from_secs(1));
        assert_eq!(policy.delay(1, None), Duration::from_secs(2));
        assert_eq!(policy.delay(2, None), Duration::from_secs(4));
        assert_eq!(policy.delay(3, None), Duration::from_secs(8));
    }

    #[test]
    fn test_retry_after_wins() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay(2, Some(Duration::from_secs(2))), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_millis(1000));
        assert!(policy.delay(64, None) >= policy.delay(31, None));
    }

    #[test]
    fn test_decide() {
        let policy = RetryPolicy::new(2, Duration::from_millis(500));
        assert_eq!(
            policy.decide(0, None),
            RetryDecision::Retry {
                delay: Duration::from_millis(500)
            }
        );
        assert_eq!(
            policy.decide(1, None),
            RetryDecision::Retry {
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(policy.decide(2, None), RetryDecision::Exhausted);
    }

    #[test]
    fn test_zero_retries_always_exhausted() {
        let policy = RetryPolicy::new(0, Duration::from_millis(500));
        assert_eq!(policy.decide(0, Some(Duration::from_secs(1))), RetryDecision::Exhausted);
    }
}
