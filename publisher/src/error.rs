//! Error types for the Stork release publisher.
//!
//! Every failure the publisher can report belongs to one [`ErrorKind`] from
//! the operator-facing taxonomy. [`PublishError`] carries the specific
//! variant and a message naming the precondition, file, or destination that
//! failed.

use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Invocation form printed alongside usage errors.
pub const USAGE: &str = concat!(
    "Usage: stork-publish [OPTIONS] <RELEASE_REF>\n",
    "  e.g. stork-publish \"v1.2.5\"\n",
    "The release ref becomes the directory to which files are uploaded on the CDN."
);

/// Operator-facing classification of publisher failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Wrong working directory or wrong execution environment.
    Context,
    /// Missing or rejected credentials.
    Credential,
    /// Missing or malformed command-line arguments.
    Usage,
    /// A declared artefact could not be read from disk.
    LocalIo,
    /// Network or storage-service failure.
    Transport,
    /// Invalid configuration or manifest file.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Context => "context error",
            Self::Credential => "credential error",
            Self::Usage => "usage error",
            Self::LocalIo => "local I/O error",
            Self::Transport => "transport error",
            Self::Config => "configuration error",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while gating, configuring, or publishing a release.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The project-root marker file was not found.
    #[error(
        "current working directory {root} doesn't look to be the Stork project root \
         ({marker} not found); run this from the Stork root directory"
    )]
    NotProjectRoot {
        /// Directory that was checked.
        root: Utf8PathBuf,
        /// Name of the marker file that was expected.
        marker: &'static str,
    },

    /// The automation-context flag is absent or falsy.
    #[error(
        "environment variable `{variable}` is not set to a truthy value; \
         this publisher should only run inside the release workflow \
         (pass --allow-local to override)"
    )]
    NotInAutomation {
        /// Name of the flag variable.
        variable: &'static str,
    },

    /// Required credential variables are missing from the environment.
    #[error("environment variables {} must be set in order to upload to S3", .missing.join(" and "))]
    MissingCredentials {
        /// Names of the missing variables.
        missing: Vec<&'static str>,
    },

    /// The storage or CDN service rejected the credentials.
    #[error("credentials rejected while {operation}: {reason}")]
    CredentialsRejected {
        /// What the publisher was doing when the rejection happened.
        operation: String,
        /// Description returned by the service.
        reason: String,
    },

    /// No release ref argument was supplied.
    #[error("no release ref was passed\n{USAGE}")]
    MissingReleaseRef,

    /// The release ref argument is not usable as a path segment.
    #[error("invalid release ref \"{value}\": {reason}\n{USAGE}")]
    InvalidReleaseRef {
        /// The rejected value.
        value: String,
        /// Which rule was violated.
        reason: &'static str,
    },

    /// A declared artefact could not be read.
    #[error("failed to read artefact {path}")]
    LocalIo {
        /// Absolute path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A storage or CDN request failed.
    #[error("{operation} failed: {reason}")]
    Transport {
        /// The request that failed.
        operation: String,
        /// Description of the failure.
        reason: String,
    },

    /// A configuration or manifest file is invalid.
    #[error("invalid configuration in {path}: {reason}")]
    InvalidConfig {
        /// File that failed to load.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// An I/O operation outside artefact reads failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Return the taxonomy bucket this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use stork_publisher::error::{ErrorKind, PublishError};
    ///
    /// assert_eq!(PublishError::MissingReleaseRef.kind(), ErrorKind::Usage);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotProjectRoot { .. } | Self::NotInAutomation { .. } | Self::Io(_) => {
                ErrorKind::Context
            }
            Self::MissingCredentials { .. } | Self::CredentialsRejected { .. } => {
                ErrorKind::Credential
            }
            Self::MissingReleaseRef | Self::InvalidReleaseRef { .. } => ErrorKind::Usage,
            Self::LocalIo { .. } => ErrorKind::LocalIo,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::InvalidConfig { .. } => ErrorKind::Config,
        }
    }
}

/// Result type alias using [`PublishError`].
pub type Result<T> = std::result::Result<T, PublishError>;
