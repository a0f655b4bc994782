//! Retry pacing for providers that keep failing.

use std::time::Duration;

use crate::source::ProviderError;

/// What the pager should do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The next near-end signal may retry straight away.
    RetryNow,
    /// Suppress retries until the delay has passed.
    RetryAfter(Duration),
    /// Stop paging this provider until the feed is reset.
    GiveUp,
}

/// Exponential backoff with a small budget of immediate retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Consecutive retryable failures allowed before delays kick in.
    pub immediate_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Consecutive failures after which the provider is treated as exhausted.
    /// Zero never gives up.
    pub give_up_after: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            immediate_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            give_up_after: 5,
        }
    }
}

impl BackoffPolicy {
    /// Decide after the `failures`-th consecutive failure (counting from 1).
    pub fn on_failure(&self, failures: u32, error: &ProviderError) -> Verdict {
        if self.give_up_after > 0 && failures >= self.give_up_after {
            return Verdict::GiveUp;
        }
        if !error.retryable {
            return Verdict::RetryAfter(self.max_delay);
        }
        if failures <= self.immediate_retries {
            return Verdict::RetryNow;
        }
        let exponent = (failures - self.immediate_retries - 1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        Verdict::RetryAfter(delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::default()
    }

    #[test]
    fn retryable_errors_get_immediate_retries_first() {
        let err = ProviderError::network("reset by peer");
        assert_eq!(policy().on_failure(1, &err), Verdict::RetryNow);
        assert_eq!(policy().on_failure(2, &err), Verdict::RetryNow);
        assert_eq!(policy().on_failure(3, &err), Verdict::RetryAfter(Duration::from_secs(1)));
        assert_eq!(policy().on_failure(4, &err), Verdict::RetryAfter(Duration::from_secs(2)));
    }

    #[test]
    fn delays_are_capped() {
        let p = BackoffPolicy {
            give_up_after: 0,
            ..policy()
        };
        let err = ProviderError::rate_limited("slow down");
        assert_eq!(p.on_failure(40, &err), Verdict::RetryAfter(Duration::from_secs(60)));
    }

    #[test]
    fn non_retryable_errors_wait_the_longest() {
        let err = ProviderError::auth_failed("bad key");
        assert_eq!(policy().on_failure(1, &err), Verdict::RetryAfter(Duration::from_secs(60)));
    }

    #[test]
    fn gives_up_after_budget() {
        let err = ProviderError::network("down");
        assert_eq!(policy().on_failure(5, &err), Verdict::GiveUp);
    }

    #[test]
    fn zero_budget_never_gives_up() {
        let p = BackoffPolicy {
            give_up_after: 0,
            ..policy()
        };
        assert_ne!(p.on_failure(1_000, &ProviderError::malformed("x")), Verdict::GiveUp);
    }
}
