//! Retry policy and the per-fetch retry state machine

use crate::config::FetchConfig;
use crate::crawler::FetchError;
use crate::ConfigError;
use rand::Rng;
use std::time::Duration;

/// Retry configuration shared by every fetch of a run
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added when the site answered 403
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Builds the policy from the `[fetch]` section
    ///
    /// Fails with `ConfigError::Validation` when a delay is not a
    /// representable number of seconds.
    pub fn from_config(config: &FetchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay()?,
            jitter: config.jitter()?,
        })
    }

    /// Backoff before retry number `retry` (1-based): `base * 2^(retry-1)`
    ///
    /// Saturates at `Duration::MAX` once the product overflows.
    pub fn backoff(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        2u32.checked_pow(retry.saturating_sub(1))
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    fn random_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..=self.jitter.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.jitter)
    }
}

/// Retry bookkeeping for a single logical fetch
///
/// Created fresh for every `Fetcher::fetch` call. Each failed attempt asks
/// for the next delay; `None` means the retry budget is spent.
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    retries: u32,
    total_delay: Duration,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retries: 0,
            total_delay: Duration::ZERO,
        }
    }

    /// Returns the delay to wait before retrying after `cause`
    ///
    /// Jitter is only added when `cause` is a 403 block.
    pub fn next_delay(&mut self, cause: &FetchError) -> Option<Duration> {
        if self.retries >= self.policy.max_retries {
            return None;
        }

        self.retries += 1;
        let mut delay = self.policy.backoff(self.retries);
        if cause.is_blocked() {
            delay = delay.saturating_add(self.policy.random_jitter());
        }
        self.total_delay = self.total_delay.saturating_add(delay);
        Some(delay)
    }

    /// Retries granted so far
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Requests issued so far, counting the first attempt
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Sum of all delays handed out
    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }
}
