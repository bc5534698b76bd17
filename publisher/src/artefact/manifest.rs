//! The artefact manifest: every file eligible for publication.
//!
//! The manifest is static configuration. Iterating it has no side effects,
//! and artefacts come back in declaration order every time.

use super::category::{ArtefactCategory, CategoryTemplates, DestinationTemplate};
use super::error::{ArtefactError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;

/// Web assets of the release bundle, with their MIME types.
const RELEASE_WEB_ASSETS: &[(&str, &str)] = &[
    ("stork.js", "text/javascript"),
    ("stork.wasm", "application/wasm"),
    ("stork.js.map", "binary/octet-stream"),
    ("basic.css", "text/css"),
    ("dark.css", "text/css"),
    ("flat.css", "text/css"),
    ("edible.css", "text/css"),
    ("edible-dark.css", "text/css"),
];

/// Platform executables, one directory per build host.
const RELEASE_BINARIES: &[&str] = &["stork-macos-10-15", "stork-ubuntu-20-04"];

/// Sample data files shipped with each release.
const RELEASE_DATA_FILES: &[&str] = &["federalist.st"];

/// A single build output eligible for publication.
///
/// # Examples
///
/// ```
/// use stork_publisher::artefact::{Artefact, ArtefactCategory};
///
/// let artefact = Artefact::new(
///     "stork.js",
///     ArtefactCategory::WebAsset,
///     Some("text/javascript".to_owned()),
/// );
/// assert_eq!(artefact.local_path(), "web-artifacts/stork.js");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artefact {
    logical_name: String,
    local_path: Utf8PathBuf,
    content_type: Option<String>,
    category: ArtefactCategory,
}

impl Artefact {
    /// Create an artefact read from its category's default location.
    #[must_use]
    pub fn new(
        logical_name: impl Into<String>,
        category: ArtefactCategory,
        content_type: Option<String>,
    ) -> Self {
        let logical_name = logical_name.into();
        let local_path = category.default_local_path(&logical_name);
        Self {
            logical_name,
            local_path,
            content_type,
            category,
        }
    }

    /// Read the artefact from `local_path` (relative to the project root)
    /// instead of the category default.
    #[must_use]
    pub fn with_local_path(mut self, local_path: impl Into<Utf8PathBuf>) -> Self {
        self.local_path = local_path.into();
        self
    }

    /// Name the artefact is published under.
    #[must_use]
    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Path of the file, relative to the project root.
    #[must_use]
    pub fn local_path(&self) -> &Utf8Path {
        &self.local_path
    }

    /// MIME type attached to uploads, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The artefact's category.
    #[must_use]
    pub fn category(&self) -> ArtefactCategory {
        self.category
    }
}

/// The ordered catalogue of artefacts plus the per-category templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    artefacts: Vec<Artefact>,
    templates: CategoryTemplates,
}

impl Manifest {
    /// Build a manifest from explicit entries, validating them.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty, a logical name is unusable as
    /// a key segment or repeated, or a web asset lacks a content type.
    pub fn new(artefacts: Vec<Artefact>, templates: CategoryTemplates) -> Result<Self> {
        if artefacts.is_empty() {
            return Err(ArtefactError::EmptyManifest);
        }

        let mut seen = HashSet::new();
        for artefact in &artefacts {
            validate_name(artefact.logical_name())?;
            if !seen.insert(artefact.logical_name()) {
                return Err(ArtefactError::DuplicateName {
                    name: artefact.logical_name().to_owned(),
                });
            }
            if artefact.category().requires_content_type() && artefact.content_type().is_none() {
                return Err(ArtefactError::MissingContentType {
                    name: artefact.logical_name().to_owned(),
                    category: artefact.category(),
                });
            }
        }

        Ok(Self {
            artefacts,
            templates,
        })
    }

    /// The built-in release manifest: the web bundle, the platform
    /// executables, and the sample index.
    #[must_use]
    pub fn release() -> Self {
        let web = RELEASE_WEB_ASSETS.iter().map(|(name, mime)| {
            Artefact::new(*name, ArtefactCategory::WebAsset, Some((*mime).to_owned()))
        });
        let binaries = RELEASE_BINARIES
            .iter()
            .map(|name| Artefact::new(*name, ArtefactCategory::PlatformBinary, None));
        let data = RELEASE_DATA_FILES
            .iter()
            .map(|name| Artefact::new(*name, ArtefactCategory::DataFile, None));

        Self {
            artefacts: web.chain(binaries).chain(data).collect(),
            templates: CategoryTemplates::default(),
        }
    }

    /// Return the artefacts in declaration order.
    #[must_use]
    pub fn artefacts(&self) -> &[Artefact] {
        &self.artefacts
    }

    /// Return the number of artefacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artefacts.len()
    }

    /// Whether the manifest declares no artefacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artefacts.is_empty()
    }

    /// Return the destination template for `category`.
    #[must_use]
    pub fn template_for(&self, category: ArtefactCategory) -> DestinationTemplate {
        self.templates.get(category)
    }

    /// Return all category templates.
    #[must_use]
    pub fn templates(&self) -> &CategoryTemplates {
        &self.templates
    }

    /// Replace the category templates, keeping the artefact list.
    #[must_use]
    pub fn with_templates(mut self, templates: CategoryTemplates) -> Self {
        self.templates = templates;
        self
    }
}

fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.trim() != name {
        Some("must not have leading or trailing whitespace")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name == "." || name == ".." {
        Some("must not be a relative directory name")
    } else {
        None
    };

    reason.map_or(Ok(()), |reason| {
        Err(ArtefactError::InvalidName {
            name: name.to_owned(),
            reason,
        })
    })
}
