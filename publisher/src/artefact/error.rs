//! Error types for artefact manifest validation.
//!
//! Each variant names the offending artefact and the rule it broke.

use super::category::ArtefactCategory;
use thiserror::Error;

/// Errors arising from an invalid artefact manifest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtefactError {
    /// The manifest declares no artefacts.
    #[error("manifest declares no artefacts")]
    EmptyManifest,

    /// An artefact in a category that requires a MIME type has none.
    #[error("artefact \"{name}\" is a {category} and must declare a content type")]
    MissingContentType {
        /// Logical name of the artefact.
        name: String,
        /// Category that requires the content type.
        category: ArtefactCategory,
    },

    /// Two artefacts share a logical name and would overwrite each other.
    #[error("artefact \"{name}\" is declared more than once")]
    DuplicateName {
        /// The repeated logical name.
        name: String,
    },

    /// A logical name cannot be used as an object key segment.
    #[error("invalid artefact name \"{name}\": {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Which rule was violated.
        reason: &'static str,
    },
}

/// Result type alias using [`ArtefactError`].
pub type Result<T> = std::result::Result<T, ArtefactError>;
