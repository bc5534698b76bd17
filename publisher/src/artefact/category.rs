//! Artefact categories and the destination templates they carry.
//!
//! A category decides two things: where its files live under the project
//! root, and which key patterns its files are published under. Templates are
//! plain data, so adding a category or flipping its bare-alias flag never
//! needs new control flow in the resolver.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory under the project root holding the web bundle.
pub const WEB_ARTEFACTS_DIR: &str = "web-artifacts";

/// Executable name inside each platform binary directory.
pub const PLATFORM_EXECUTABLE: &str = "stork";

/// The kind of build output an artefact is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ArtefactCategory {
    /// Browser-facing bundle files (JavaScript, WebAssembly, CSS).
    WebAsset,
    /// A compiled executable for one target platform.
    PlatformBinary,
    /// A raw data file such as a prebuilt search index.
    DataFile,
}

impl ArtefactCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 3] = [Self::WebAsset, Self::PlatformBinary, Self::DataFile];

    /// Whether artefacts of this category must declare a MIME content type.
    #[must_use]
    pub const fn requires_content_type(self) -> bool {
        matches!(self, Self::WebAsset)
    }

    /// Return the default local path for an artefact, relative to the
    /// project root.
    ///
    /// Platform binaries live in one directory per platform, each holding an
    /// executable with the same file name.
    ///
    /// # Examples
    ///
    /// ```
    /// use stork_publisher::artefact::ArtefactCategory;
    ///
    /// assert_eq!(
    ///     ArtefactCategory::WebAsset.default_local_path("stork.js"),
    ///     "web-artifacts/stork.js"
    /// );
    /// assert_eq!(
    ///     ArtefactCategory::PlatformBinary.default_local_path("stork-ubuntu-20-04"),
    ///     "stork-ubuntu-20-04/stork"
    /// );
    /// ```
    #[must_use]
    pub fn default_local_path(self, logical_name: &str) -> Utf8PathBuf {
        match self {
            Self::WebAsset => Utf8PathBuf::from(WEB_ARTEFACTS_DIR).join(logical_name),
            Self::PlatformBinary => Utf8PathBuf::from(logical_name).join(PLATFORM_EXECUTABLE),
            Self::DataFile => Utf8PathBuf::from(logical_name),
        }
    }

    /// Return the destination template used when no override is configured.
    ///
    /// Web assets get a bare root alias so the bundle has stable URLs such
    /// as `/stork.js`; binaries and data files are only reachable through
    /// the `releases/` namespace.
    #[must_use]
    pub const fn default_template(self) -> DestinationTemplate {
        match self {
            Self::WebAsset => DestinationTemplate::new(true),
            Self::PlatformBinary | Self::DataFile => DestinationTemplate::new(false),
        }
    }
}

impl fmt::Display for ArtefactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WebAsset => "web asset",
            Self::PlatformBinary => "platform binary",
            Self::DataFile => "data file",
        };
        f.write_str(label)
    }
}

/// One object-key pattern an artefact is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// `releases/<ref>/<name>`
    Versioned,
    /// `releases/latest/<name>`
    Latest,
    /// `<name>` at the bucket root.
    BareRoot,
}

/// The ordered set of key patterns for a category.
///
/// The versioned path and the latest alias are always present; only the
/// bare root alias is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestinationTemplate {
    bare_alias: bool,
}

impl DestinationTemplate {
    /// Create a template, optionally including the bare root alias.
    #[must_use]
    pub const fn new(bare_alias: bool) -> Self {
        Self { bare_alias }
    }

    /// Whether the bare root alias is published.
    #[must_use]
    pub const fn bare_alias(self) -> bool {
        self.bare_alias
    }

    /// Return the key patterns in publication order.
    ///
    /// # Examples
    ///
    /// ```
    /// use stork_publisher::artefact::{DestinationTemplate, KeyPattern};
    ///
    /// let patterns = DestinationTemplate::new(false).patterns();
    /// assert_eq!(patterns, vec![KeyPattern::Versioned, KeyPattern::Latest]);
    /// ```
    #[must_use]
    pub fn patterns(self) -> Vec<KeyPattern> {
        let mut patterns = vec![KeyPattern::Versioned, KeyPattern::Latest];
        if self.bare_alias {
            patterns.push(KeyPattern::BareRoot);
        }
        patterns
    }
}

/// Destination templates for every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTemplates {
    web_asset: DestinationTemplate,
    platform_binary: DestinationTemplate,
    data_file: DestinationTemplate,
}

impl CategoryTemplates {
    /// Return the template for `category`.
    #[must_use]
    pub const fn get(&self, category: ArtefactCategory) -> DestinationTemplate {
        match category {
            ArtefactCategory::WebAsset => self.web_asset,
            ArtefactCategory::PlatformBinary => self.platform_binary,
            ArtefactCategory::DataFile => self.data_file,
        }
    }

    /// Replace the template for `category`.
    pub fn set(&mut self, category: ArtefactCategory, template: DestinationTemplate) {
        let slot = match category {
            ArtefactCategory::WebAsset => &mut self.web_asset,
            ArtefactCategory::PlatformBinary => &mut self.platform_binary,
            ArtefactCategory::DataFile => &mut self.data_file,
        };
        *slot = template;
    }
}

impl Default for CategoryTemplates {
    fn default() -> Self {
        Self {
            web_asset: ArtefactCategory::WebAsset.default_template(),
            platform_binary: ArtefactCategory::PlatformBinary.default_template(),
            data_file: ArtefactCategory::DataFile.default_template(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::web(ArtefactCategory::WebAsset, true)]
    #[case::binary(ArtefactCategory::PlatformBinary, false)]
    #[case::data(ArtefactCategory::DataFile, false)]
    fn default_bare_alias_per_category(#[case] category: ArtefactCategory, #[case] bare: bool) {
        assert_eq!(category.default_template().bare_alias(), bare);
    }

    #[test]
    fn every_template_keeps_versioned_and_latest_first() {
        for bare_alias in [false, true] {
            let patterns = DestinationTemplate::new(bare_alias).patterns();
            assert_eq!(
                patterns.get(..2),
                Some([KeyPattern::Versioned, KeyPattern::Latest].as_slice())
            );
        }
    }

    #[test]
    fn data_files_are_read_from_the_project_root() {
        assert_eq!(
            ArtefactCategory::DataFile.default_local_path("federalist.st"),
            "federalist.st"
        );
    }

    #[test]
    fn set_overrides_only_the_named_category() {
        let mut templates = CategoryTemplates::default();
        templates.set(ArtefactCategory::DataFile, DestinationTemplate::new(true));
        assert!(templates.get(ArtefactCategory::DataFile).bare_alias());
        assert!(!templates.get(ArtefactCategory::PlatformBinary).bare_alias());
        assert!(templates.get(ArtefactCategory::WebAsset).bare_alias());
    }

    #[test]
    fn categories_deserialise_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            category: ArtefactCategory,
        }
        let parsed: Wrapper =
            toml::from_str("category = \"platform-binary\"").expect("valid category");
        assert_eq!(parsed.category, ArtefactCategory::PlatformBinary);
    }
}
