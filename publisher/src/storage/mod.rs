//! Object storage seam.
//!
//! The uploader talks to storage only through [`ObjectStore`]. The
//! production implementation is [`s3::S3ObjectStore`]; tests use mocks or
//! the recording fake from `test_utils`.

pub mod s3;

use crate::artefact::sha256_digest::Sha256Digest;
use crate::destination::Destination;
use crate::retry::Transient;
use thiserror::Error;

pub use s3::S3ObjectStore;

/// Failures reported by an [`ObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store refused the credentials.
    #[error("access denied: {reason}")]
    Unauthorized {
        /// Description from the store.
        reason: String,
    },

    /// A failure that may clear up on retry.
    #[error("transient failure: {reason}")]
    Transient {
        /// Description from the store or transport.
        reason: String,
    },

    /// A failure that will not clear up on retry.
    #[error("{reason}")]
    Permanent {
        /// Description from the store.
        reason: String,
    },
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Writes objects to a bucket, overwriting whatever is already there.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectStore {
    /// Store `body` at `destination`, attaching its content type and
    /// `digest` as an integrity checksum.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] classifying the failure.
    fn put_object(
        &self,
        destination: &Destination,
        body: &[u8],
        digest: &Sha256Digest,
    ) -> Result<(), StoreError>;
}
