//! Destination resolution: where each artefact is published.
//!
//! Keys are a pure function of the artefact, the release ref, and the
//! artefact's category template. Resolving the same inputs twice yields the
//! same destinations in the same order, which is what makes re-publishing a
//! release idempotent.

use crate::artefact::{Artefact, DestinationTemplate, KeyPattern, Manifest};
use crate::release_ref::{LATEST_ALIAS, ReleaseRef};
use serde::Serialize;
use std::fmt;

/// Key prefix for every release directory.
pub const RELEASES_PREFIX: &str = "releases";

/// A fully-qualified object location plus the metadata to attach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Destination {
    /// Target bucket.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
    /// MIME type stored with the object, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

impl KeyPattern {
    /// Render the object key for `logical_name` under `release`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stork_publisher::artefact::KeyPattern;
    /// use stork_publisher::release_ref::ReleaseRef;
    ///
    /// let release = ReleaseRef::try_from("v1.2.5").expect("valid");
    /// assert_eq!(KeyPattern::Versioned.render(&release, "stork.js"), "releases/v1.2.5/stork.js");
    /// assert_eq!(KeyPattern::Latest.render(&release, "stork.js"), "releases/latest/stork.js");
    /// assert_eq!(KeyPattern::BareRoot.render(&release, "stork.js"), "stork.js");
    /// ```
    #[must_use]
    pub fn render(self, release: &ReleaseRef, logical_name: &str) -> String {
        match self {
            Self::Versioned => format!("{RELEASES_PREFIX}/{release}/{logical_name}"),
            Self::Latest => format!("{RELEASES_PREFIX}/{LATEST_ALIAS}/{logical_name}"),
            Self::BareRoot => logical_name.to_owned(),
        }
    }
}

/// Maps artefacts to their destinations in one bucket.
#[derive(Debug, Clone)]
pub struct PathResolver {
    bucket: String,
}

impl PathResolver {
    /// Create a resolver targeting `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    /// Return the target bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve the ordered destinations for one artefact.
    ///
    /// # Examples
    ///
    /// ```
    /// use stork_publisher::artefact::{Artefact, ArtefactCategory};
    /// use stork_publisher::destination::PathResolver;
    /// use stork_publisher::release_ref::ReleaseRef;
    ///
    /// let resolver = PathResolver::new("files.stork-search.net");
    /// let release = ReleaseRef::try_from("v1.2.5").expect("valid");
    /// let binary = Artefact::new("stork-ubuntu-20-04", ArtefactCategory::PlatformBinary, None);
    ///
    /// let keys: Vec<String> = resolver
    ///     .resolve(&binary, ArtefactCategory::PlatformBinary.default_template(), &release)
    ///     .into_iter()
    ///     .map(|d| d.key)
    ///     .collect();
    /// assert_eq!(
    ///     keys,
    ///     ["releases/v1.2.5/stork-ubuntu-20-04", "releases/latest/stork-ubuntu-20-04"]
    /// );
    /// ```
    #[must_use]
    pub fn resolve(
        &self,
        artefact: &Artefact,
        template: DestinationTemplate,
        release: &ReleaseRef,
    ) -> Vec<Destination> {
        template
            .patterns()
            .into_iter()
            .map(|pattern| Destination {
                bucket: self.bucket.clone(),
                key: pattern.render(release, artefact.logical_name()),
                content_type: artefact.content_type().map(str::to_owned),
            })
            .collect()
    }

    /// Resolve every artefact in `manifest`, pairing each with its
    /// destinations, in manifest order.
    #[must_use]
    pub fn plan<'m>(
        &self,
        manifest: &'m Manifest,
        release: &ReleaseRef,
    ) -> Vec<(&'m Artefact, Vec<Destination>)> {
        manifest
            .artefacts()
            .iter()
            .map(|artefact| {
                let template = manifest.template_for(artefact.category());
                (artefact, self.resolve(artefact, template, release))
            })
            .collect()
    }
}
