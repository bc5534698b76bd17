//! Release reference validation.
//!
//! The release ref is an opaque operator-supplied string (usually a version
//! tag) that namespaces versioned destinations under `releases/<ref>/`. It is
//! validated once, at the precondition gate, so that every key derived from
//! it stays inside its own directory.

use crate::error::{PublishError, Result};
use serde::Serialize;
use std::fmt;

/// Directory name reserved for the latest alias.
pub const LATEST_ALIAS: &str = "latest";

/// A validated release reference.
///
/// # Examples
///
/// ```
/// use stork_publisher::release_ref::ReleaseRef;
///
/// let release = ReleaseRef::try_from("v1.2.5").expect("valid release ref");
/// assert_eq!(release.as_str(), "v1.2.5");
/// assert!(ReleaseRef::try_from("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseRef(String);

impl ReleaseRef {
    /// Return the ref as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ReleaseRef {
    type Error = PublishError;

    fn try_from(value: &str) -> Result<Self> {
        validate(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for ReleaseRef {
    type Error = PublishError;

    fn try_from(value: String) -> Result<Self> {
        validate(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for ReleaseRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PublishError::MissingReleaseRef);
    }

    let reason = if value.trim() != value {
        Some("must not have leading or trailing whitespace")
    } else if value.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if value == "." || value == ".." {
        Some("must not be a relative directory name")
    } else if value == LATEST_ALIAS {
        Some("\"latest\" is reserved for the latest alias")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PublishError::InvalidReleaseRef {
            value: value.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}
