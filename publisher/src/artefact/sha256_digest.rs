//! SHA-256 digest of artefact bytes.
//!
//! The digest is sent with every upload so the store can reject corrupted
//! transfers, and it is recorded in the publish report so two runs can be
//! compared byte-for-byte without downloading anything.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, Serializer};
use sha2::digest::Output;
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest.
///
/// # Examples
///
/// ```
/// use stork_publisher::artefact::sha256_digest::Sha256Digest;
///
/// let digest = Sha256Digest::of(b"ABC");
/// assert_eq!(digest.to_string().len(), 64);
/// assert_eq!(digest, Sha256Digest::of(b"ABC"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// Hash `bytes`.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Return the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the digest in the base64 form S3 expects for
    /// `x-amz-checksum-sha256`.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", Output::<Sha256>::from(self.0))
    }
}

impl Serialize for Sha256Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
