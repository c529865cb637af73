//! Bounded retry for whole page resolutions.
//!
//! Every failure class is retried: the hosts intermittently serve truncated
//! pages, shuffled tokens and spurious 404s, so a fresh handshake is the
//! remedy for all of them. The bound keeps a dead link from spinning forever.
//!
//! ```
//! use imgview_core::resolver::{RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! assert!(matches!(policy.should_retry(1), RetryDecision::Retry { attempt: 2, .. }));
//! assert!(matches!(policy.should_retry(5), RetryDecision::GiveUp { .. }));
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

/// Default maximum attempts per resolution, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Decision after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Start another attempt after `delay`.
    Retry {
        /// Pause before the next attempt.
        delay: Duration,
        /// Number of the upcoming attempt (1-indexed).
        attempt: u32,
    },

    /// Stop and surface the last error.
    GiveUp {
        /// Human-readable reason.
        reason: String,
    },
}

/// Attempt bound with an optional fixed pause between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with `max_attempts` (clamped to at least 1) and `delay`.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates a policy with a custom bound and no pause.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Maximum attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after attempt number `attempt` (1-indexed) failed.
    #[instrument(level = "debug", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!("attempt budget exhausted");
            return RetryDecision::GiveUp {
                reason: format!("gave up after {attempt} attempts"),
            };
        }
        RetryDecision::Retry {
            delay: self.delay,
            attempt: attempt + 1,
        }
    }
}
