//! CDN cache invalidation.
//!
//! After the upload phase the pipeline purges the whole distribution with a
//! single request. Every request carries a fresh caller reference so the CDN
//! never mistakes a new purge for a replay of an earlier one; retries of the
//! same purge reuse its reference.

pub mod cloudfront;

use crate::error::{PublishError, Result};
use crate::retry::{RetryPolicy, Sleeper, Transient};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub use cloudfront::CloudFrontClient;

/// Path pattern covering every object in the distribution.
pub const INVALIDATE_ALL_PATHS: &str = "/*";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Failures reported by a [`CdnClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdnError {
    /// The CDN refused the credentials.
    #[error("access denied: {reason}")]
    Unauthorized {
        /// Description from the CDN.
        reason: String,
    },

    /// A failure that may clear up on retry.
    #[error("transient failure: {reason}")]
    Transient {
        /// Description from the CDN or transport.
        reason: String,
    },

    /// A failure that will not clear up on retry.
    #[error("{reason}")]
    Permanent {
        /// Description from the CDN.
        reason: String,
    },
}

impl Transient for CdnError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Source of wall-clock time.
pub trait Clock {
    /// The current time.
    fn now(&self) -> SystemTime;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Unique token identifying one invalidation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CallerReference(String);

impl CallerReference {
    /// Generate a reference from the current time and a process-wide
    /// sequence number.
    ///
    /// # Examples
    ///
    /// ```
    /// use stork_publisher::cdn::{CallerReference, SystemClock};
    ///
    /// let first = CallerReference::generate(&SystemClock);
    /// let second = CallerReference::generate(&SystemClock);
    /// assert_ne!(first, second);
    /// ```
    #[must_use]
    pub fn generate(clock: &dyn Clock) -> Self {
        let since_epoch = clock.now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}.{:09}-{sequence}",
            since_epoch.as_secs(),
            since_epoch.subsec_nanos()
        ))
    }

    /// Return the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cache-purge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    /// Distribution to purge.
    pub distribution_id: String,
    /// Path patterns to purge.
    pub paths: Vec<String>,
    /// Token making the request unique.
    pub caller_reference: CallerReference,
}

/// Sends invalidation requests to a CDN.
#[cfg_attr(test, mockall::automock)]
pub trait CdnClient {
    /// Submit `request`, returning the CDN's invalidation id.
    ///
    /// # Errors
    ///
    /// Returns a [`CdnError`] classifying the failure.
    fn create_invalidation(
        &self,
        request: &InvalidationRequest,
    ) -> std::result::Result<String, CdnError>;
}

/// Result of a successful purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    /// Id assigned by the CDN.
    pub id: String,
    /// Reference the request was sent with.
    pub caller_reference: CallerReference,
    /// Attempts made.
    pub attempts: u32,
}

/// Purges one distribution.
pub struct CacheInvalidator<'a> {
    client: &'a dyn CdnClient,
    distribution_id: &'a str,
    clock: &'a dyn Clock,
    retry: RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> CacheInvalidator<'a> {
    /// Create an invalidator for `distribution_id`.
    #[must_use]
    pub fn new(
        client: &'a dyn CdnClient,
        distribution_id: &'a str,
        clock: &'a dyn Clock,
        retry: RetryPolicy,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            client,
            distribution_id,
            clock,
            retry,
            sleeper,
        }
    }

    /// Purge every path in the distribution.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::CredentialsRejected`] when the CDN refuses the
    /// credentials and [`PublishError::Transport`] for any other failure
    /// that outlasts the retry policy.
    pub fn invalidate(&self) -> Result<Invalidation> {
        let request = InvalidationRequest {
            distribution_id: self.distribution_id.to_owned(),
            paths: vec![INVALIDATE_ALL_PATHS.to_owned()],
            caller_reference: CallerReference::generate(self.clock),
        };
        log::debug!(
            "invalidating {INVALIDATE_ALL_PATHS} on {} (caller reference {})",
            request.distribution_id,
            request.caller_reference
        );

        let retried = self
            .retry
            .run(self.sleeper, "cache invalidation", |_| {
                self.client.create_invalidation(&request)
            });

        match retried.result {
            Ok(id) => {
                log::info!("created invalidation {id} on {}", request.distribution_id);
                Ok(Invalidation {
                    id,
                    caller_reference: request.caller_reference,
                    attempts: retried.attempts,
                })
            }
            Err(CdnError::Unauthorized { reason }) => Err(PublishError::CredentialsRejected {
                operation: format!("invalidating distribution {}", request.distribution_id),
                reason,
            }),
            Err(err) => Err(PublishError::Transport {
                operation: format!("cache invalidation of {}", request.distribution_id),
                reason: err.to_string(),
            }),
        }
    }
}
