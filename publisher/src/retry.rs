//! Bounded retry with exponential backoff.
//!
//! Delays come from `tokio-retry`'s [`ExponentialBackoff`] strategy, consumed
//! as a plain iterator so the retry loop stays synchronous. Sleeping goes
//! through the [`Sleeper`] trait so tests can record delays without waiting.

use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Attempts per request when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
/// Delay before the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);
/// Upper bound on any single delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Errors that can say whether retrying might help.
pub trait Transient {
    /// Whether a later attempt could succeed.
    fn is_transient(&self) -> bool;
}

/// Blocks the current thread between attempts.
#[cfg_attr(test, mockall::automock)]
pub trait Sleeper {
    /// Wait for `delay`.
    fn sleep(&self, delay: Duration);
}

/// Sleeps on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter: true,
        }
    }
}

/// The result of a retried operation plus the attempts it took.
#[derive(Debug)]
pub struct Retried<T, E> {
    /// Outcome of the final attempt.
    pub result: Result<T, E>,
    /// Attempts made, at least one.
    pub attempts: u32,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the attempt limit.
    ///
    /// # Errors
    ///
    /// Returns an error message when `max_attempts` is zero.
    pub fn with_max_attempts(self, max_attempts: u32) -> Result<Self, &'static str> {
        if max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        Ok(Self {
            max_attempts,
            ..self
        })
    }

    /// Set the first delay and the delay cap.
    #[must_use]
    pub fn with_backoff(self, initial: Duration, max: Duration) -> Self {
        Self {
            initial_backoff: initial,
            max_backoff: max,
            ..self
        }
    }

    /// Disable random jitter so delays are deterministic.
    #[must_use]
    pub fn without_jitter(self) -> Self {
        Self {
            jitter: false,
            ..self
        }
    }

    /// Return the attempt limit.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Return the delays slept between attempts, one fewer than the attempt
    /// limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use stork_publisher::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default()
    ///     .with_max_attempts(4)
    ///     .expect("non-zero")
    ///     .with_backoff(Duration::from_millis(100), Duration::from_millis(300))
    ///     .without_jitter();
    /// let delays: Vec<_> = policy.delays().collect();
    /// assert_eq!(
    ///     delays,
    ///     [Duration::from_millis(100), Duration::from_millis(200), Duration::from_millis(300)]
    /// );
    /// ```
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        // The strategy yields `2^n * factor` milliseconds for n = 1, 2, ...
        let millis = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let factor = (millis / 2).max(1);
        let with_jitter = self.jitter;
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_backoff)
            .map(move |delay| if with_jitter { jitter(delay) } else { delay })
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt limit
    /// is reached.
    ///
    /// `op` receives the 1-based attempt number. Only errors that report
    /// themselves as [`Transient`] are retried.
    pub fn run<T, E, F>(&self, sleeper: &dyn Sleeper, operation: &str, mut op: F) -> Retried<T, E>
    where
        E: Transient + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut delays = self.delays();
        let mut attempts = 1;
        loop {
            let result = op(attempts);
            let next = match &result {
                Err(err) if err.is_transient() => delays.next().map(|d| (d, err.to_string())),
                _ => None,
            };
            let Some((delay, reason)) = next else {
                return Retried { result, attempts };
            };
            log::warn!(
                "{operation} failed on attempt {attempts} of {}: {reason}; retrying in {delay:?}",
                self.max_attempts
            );
            sleeper.sleep(delay);
            attempts += 1;
        }
    }
}
