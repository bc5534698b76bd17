//! Transfers artefact bytes to their destinations.
//!
//! Each upload is one blocking `PutObject` per destination, wrapped in the
//! retry policy. Uploads overwrite, so publishing the same release twice
//! leaves the bucket in the same state. Failures are returned as data in an
//! [`UploadOutcome`] rather than raised, leaving the abort decision to the
//! pipeline.

use crate::artefact::sha256_digest::Sha256Digest;
use crate::destination::Destination;
use crate::error::{ErrorKind, PublishError};
use crate::retry::{RetryPolicy, Sleeper};
use crate::storage::{ObjectStore, StoreError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::error::Error as _;

/// Why an upload or the invalidation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetail {
    /// Taxonomy bucket.
    pub kind: ErrorKind,
    /// Diagnostic naming the file or destination.
    pub message: String,
}

impl From<&PublishError> for FailureDetail {
    fn from(err: &PublishError) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            kind: err.kind(),
            message,
        }
    }
}

/// The result of uploading to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Where the bytes were sent.
    pub destination: Destination,
    /// Requests made, zero when the file could not be read.
    pub attempts: u32,
    /// Digest of the bytes sent, when the file was read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<Sha256Digest>,
    /// Failure details, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,
}

impl UploadOutcome {
    /// Whether the upload succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// An outcome for a destination whose source file could not be read.
    #[must_use]
    pub fn unreadable(destination: Destination, err: &PublishError) -> Self {
        Self {
            destination,
            attempts: 0,
            digest: None,
            error: Some(FailureDetail::from(err)),
        }
    }
}

/// An artefact's bytes, read once and shared by all its destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
    digest: Sha256Digest,
}

impl Payload {
    /// Wrap bytes already in memory.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let digest = Sha256Digest::of(&bytes);
        Self { bytes, digest }
    }

    /// Read the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::LocalIo`] if the file cannot be read.
    pub fn read(path: &Utf8Path) -> Result<Self, PublishError> {
        let bytes = std::fs::read(path).map_err(|source| PublishError::LocalIo {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::new(bytes))
    }

    /// The payload bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Digest of the bytes.
    #[must_use]
    pub fn digest(&self) -> Sha256Digest {
        self.digest
    }
}

/// Uploads files under a project root to an [`ObjectStore`].
pub struct Uploader<'a> {
    store: &'a dyn ObjectStore,
    project_root: Utf8PathBuf,
    retry: RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Uploader<'a> {
    /// Create an uploader reading paths relative to `project_root`.
    #[must_use]
    pub fn new(
        store: &'a dyn ObjectStore,
        project_root: &Utf8Path,
        retry: RetryPolicy,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            store,
            project_root: project_root.to_owned(),
            retry,
            sleeper,
        }
    }

    /// Resolve `local_path` against the project root.
    #[must_use]
    pub fn source_path(&self, local_path: &Utf8Path) -> Utf8PathBuf {
        self.project_root.join(local_path)
    }

    /// Read the file at `local_path` under the project root.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::LocalIo`] if the file cannot be read.
    pub fn load(&self, local_path: &Utf8Path) -> Result<Payload, PublishError> {
        Payload::read(&self.source_path(local_path))
    }

    /// Read `local_path` and upload it to `destination`.
    #[must_use]
    pub fn upload(&self, local_path: &Utf8Path, destination: &Destination) -> UploadOutcome {
        match self.load(local_path) {
            Ok(payload) => self.send(&payload, destination),
            Err(err) => {
                log::error!("{err}");
                UploadOutcome::unreadable(destination.clone(), &err)
            }
        }
    }

    /// Upload an already-read payload to `destination`.
    #[must_use]
    pub fn send(&self, payload: &Payload, destination: &Destination) -> UploadOutcome {
        let digest = payload.digest();
        let operation = format!("upload to {destination}");
        let retried = self.retry.run(self.sleeper, &operation, |_| {
            self.store.put_object(destination, payload.bytes(), &digest)
        });

        let error = match retried.result {
            Ok(()) => {
                log::info!(
                    "uploaded {destination} ({} bytes, sha256 {digest})",
                    payload.bytes().len()
                );
                None
            }
            Err(err) => {
                let err = into_publish_error(err, destination);
                log::error!("{err}");
                Some(FailureDetail::from(&err))
            }
        };

        UploadOutcome {
            destination: destination.clone(),
            attempts: retried.attempts,
            digest: Some(digest),
            error,
        }
    }
}

fn into_publish_error(err: StoreError, destination: &Destination) -> PublishError {
    match err {
        StoreError::Unauthorized { reason } => PublishError::CredentialsRejected {
            operation: format!("uploading to {destination}"),
            reason,
        },
        StoreError::Transient { .. } | StoreError::Permanent { .. } => PublishError::Transport {
            operation: format!("upload to {destination}"),
            reason: err.to_string(),
        },
    }
}
