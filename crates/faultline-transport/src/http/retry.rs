//! Retry policy for report delivery
//!
//! Reports are best-effort: a few attempts with exponential backoff, then the
//! report is dropped. Nothing here ever waits on the caller's thread.

use crate::error::TransportError;
use std::time::Duration;

/// Bounded exponential backoff with jitter.
///
/// For retry `n` (0-indexed, i.e. the wait after the `n + 1`th failed attempt):
/// ```text
/// base   = initial_delay * multiplier^n
/// jitter = base * jitter * random(-1.0, +1.0)
/// delay  = min(base + jitter, max_delay)
/// ```
///
/// # Default Configuration
///
/// - `max_retries`: 2 (three attempts in total)
/// - `initial_delay`: 500ms
/// - `max_delay`: 10s
/// - `multiplier`: 2.0
/// - `jitter`: 0.1
///
/// # Examples
///
/// ```rust
/// use faultline_transport::http::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(4)
///     .initial_delay(Duration::from_millis(100))
///     .build();
/// assert_eq!(policy.max_retries(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            policy: Self::default(),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide whether attempt number `attempt` (0-indexed) may be followed by another.
    pub fn should_retry(&self, error: &TransportError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }

    /// Delay to wait after failed attempt `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        let jittered = if self.jitter > 0.0 {
            base + base * self.jitter * (rand::random::<f64>() - 0.5) * 2.0
        } else {
            base
        };

        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    /// Set the maximum number of retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    /// Set the upper bound on any single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    /// Set the exponential multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier.max(1.0);
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.policy.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Build the retry policy.
    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}
