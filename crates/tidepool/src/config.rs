//! Configuration for a [`Pool`](crate::Pool).
//!
//! ## Key Concepts
//! - **Eternal workers**: `worker_count` workers spawned at construction that
//!   live as long as the pool.
//! - **Capacity**: the maximum number of queued plus in-flight jobs a single
//!   worker accepts before it reports backpressure.
//! - **Expiry**: the lifetime of a temporary worker spawned under load.
//! - **Retry**: how long admission keeps re-sampling a saturated registry
//!   before escalating.

use core::time::Duration;

/// Smallest supported eternal worker count. Power-of-two-choices needs two
/// distinct candidates.
pub const MIN_WORKERS: usize = 2;

pub const DEFAULT_WORKER_COUNT: usize = 4;

pub const DEFAULT_CAPACITY: usize = 16;

pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(30);

/// Number of timed samples taken per registry before escalating.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Decides which sample a retry round hands to the next stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleMode {
    /// Sleep and sample for every attempt, then use the last sample, even if
    /// an earlier one was admissible. Gives transient load the whole window to
    /// subside before escalating.
    #[default]
    LastAttempt,
    /// Stop at the first sample that yields a non-blocking worker.
    FirstAdmissible,
}

/// Timed re-sampling applied to each registry in turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub interval: Duration,
    pub mode: SampleMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            interval: DEFAULT_RETRY_INTERVAL,
            mode: SampleMode::default(),
        }
    }
}

impl RetryPolicy {
    /// Worst-case time a caller can spend in both retry rounds before the pool
    /// spawns a temporary worker.
    pub fn budget(&self) -> Duration {
        let attempts = u32::try_from(self.attempts).unwrap_or(u32::MAX);
        self.interval.saturating_mul(attempts.saturating_mul(2))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of eternal workers. Must be at least [`MIN_WORKERS`].
    pub worker_count: usize,
    /// Maximum queued plus in-flight jobs per worker. Must be non-zero.
    pub capacity: usize,
    /// Lifetime of a temporary worker, measured from its creation.
    pub expiry: Duration,
    pub retry: RetryPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            capacity: DEFAULT_CAPACITY,
            expiry: DEFAULT_EXPIRY,
            retry: RetryPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn new(worker_count: usize, capacity: usize, expiry: Duration) -> Self {
        Self {
            worker_count,
            capacity,
            expiry,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_sample_mode(mut self, mode: SampleMode) -> Self {
        self.retry.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_six_intervals() {
        assert_eq!(RetryPolicy::default().budget(), Duration::from_secs(6));
    }

    #[test]
    fn budget_saturates_instead_of_wrapping() {
        let retry = RetryPolicy {
            attempts: usize::MAX,
            interval: Duration::from_millis(1),
            mode: SampleMode::LastAttempt,
        };
        assert_eq!(retry.budget(), Duration::from_millis(1).saturating_mul(u32::MAX));

        let retry = RetryPolicy {
            interval: Duration::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(retry.budget(), Duration::MAX);
    }

    #[test]
    fn builders_keep_sizing() {
        let config = PoolConfig::new(3, 8, Duration::from_secs(5))
            .with_sample_mode(SampleMode::FirstAdmissible);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.retry.mode, SampleMode::FirstAdmissible);
        assert_eq!(config.retry.attempts, DEFAULT_RETRY_ATTEMPTS);
    }
}
