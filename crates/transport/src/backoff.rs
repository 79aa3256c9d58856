//! Bounded exponential backoff for optional delivery retries.
//!
//! Retries are off unless `RetryConfig::enabled` is set. When enabled, the
//! delay before retry `n` is:
//!
//! ```text
//! delay[n] = min(initial * multiplier^(n-1), max_delay)
//! ```
//!
//! and the schedule stops after `max_attempts` retries. There is no
//! open-ended mode: a simulator that keeps failing should stop and say so.

use std::time::Duration;

use thiserror::Error;

use super::config::RetryConfig;

/// Upper bound of the growth factor, matching `RetryConfig` validation.
pub const MAX_MULTIPLIER: f64 = 10.0;

/// Backoff gave up.
#[derive(Debug, Error)]
pub enum BackoffError {
    /// The retry budget is used up; carries the configured limit.
    #[error("Maximum number of attempts exceeded: {0}")]
    MaxAttemptLimitError(u32),
}

/// Exponential delay schedule with a hard attempt limit.
#[derive(Debug, Clone)]
pub struct Backoff {
    current_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    attempt: u32,
    max_attempts: u32,
}

impl Backoff {
    /// Creates a schedule starting at `initial`, growing by `multiplier` and
    /// capped at `max`, allowing at most `max_attempts` retries.
    ///
    /// `multiplier` is clamped to `1.0..=MAX_MULTIPLIER`; NaN means a
    /// constant delay.
    pub fn new(initial: Duration, max: Duration, multiplier: f64, max_attempts: u32) -> Self {
        let multiplier = if multiplier.is_nan() {
            1.0
        } else {
            multiplier.clamp(1.0, MAX_MULTIPLIER)
        };
        Self {
            current_delay: initial.min(max),
            max_delay: max,
            multiplier,
            attempt: 0,
            max_attempts,
        }
    }

    /// Builds the schedule described by a retry section.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.multiplier,
            config.max_attempts,
        )
    }

    /// Returns the delay before the next retry and advances the schedule.
    ///
    /// # Errors
    ///
    /// `BackoffError::MaxAttemptLimitError` once `max_attempts` delays have
    /// been handed out.
    pub fn next_sleep(&mut self) -> Result<Duration, BackoffError> {
        if self.attempt >= self.max_attempts {
            return Err(BackoffError::MaxAttemptLimitError(self.max_attempts));
        }
        self.attempt += 1;

        let sleep = self.current_delay;
        self.current_delay =
            Duration::try_from_secs_f64(self.current_delay.as_secs_f64() * self.multiplier)
                .map_or(self.max_delay, |next| next.min(self.max_delay));

        Ok(sleep)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for Backoff {
    /// 500 ms initial delay, doubling, capped at 10 s, 3 retries.
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
