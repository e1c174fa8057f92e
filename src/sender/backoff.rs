//! Retry cadence for the root sender.

use std::time::Duration;

/// Default wait between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackoffPolicy {
    /// Wait after each failed attempt
    pub interval: Duration,
    /// Retries allowed after the first failure; `None` retries forever
    pub max_retries: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            max_retries: None,
        }
    }
}

impl BackoffPolicy {
    /// Retry forever every `interval`.
    #[must_use]
    pub const fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_retries: None,
        }
    }

    /// Give up after `retries` retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Whether a message that has failed `failures` times gets another try.
    #[must_use]
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_retries.is_none_or(|max| failures <= max)
    }
}

/// Waits between attempts; swapped out in tests to observe the cadence.
pub trait Sleeper: Send + Sync {
    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
