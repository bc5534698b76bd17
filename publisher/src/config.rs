//! Publisher configuration, captured once at startup.
//!
//! Process-wide inputs (environment variables, the optional `publish.toml`
//! file, command-line overrides) are read exactly once and frozen into
//! [`EnvSnapshot`] and [`PublishConfig`]. Nothing downstream reads ambient
//! process state, so the gate and the pipeline can be tested with plain
//! values.

use crate::artefact::{Artefact, ArtefactCategory, DestinationTemplate, Manifest};
use crate::credentials::{ACCESS_KEY_ID_VAR, SECRET_ACCESS_KEY_VAR, SESSION_TOKEN_VAR};
use crate::error::{PublishError, Result};
use crate::pipeline::FailurePolicy;
use crate::retry::RetryPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Bucket the CDN serves release files from.
pub const DEFAULT_BUCKET: &str = "files.stork-search.net";
/// CloudFront distribution in front of [`DEFAULT_BUCKET`].
pub const DEFAULT_DISTRIBUTION_ID: &str = "E3PBNOZP9XRSWN";
/// Region of [`DEFAULT_BUCKET`].
pub const DEFAULT_REGION: &str = "us-east-1";
/// Config file looked up in the project root when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "publish.toml";
/// Environment variable set by the release workflow runner.
pub const AUTOMATION_FLAG_VAR: &str = "GITHUB_ACTIONS";

/// Source of environment variables.
///
/// Abstracted so tests can supply a fixed map instead of mutating the
/// process environment.
pub trait Environment {
    /// Return the value of `key`, or `None` when unset or not UTF-8.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// The environment variables the publisher consumes, captured once.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// `AWS_ACCESS_KEY_ID`.
    pub access_key_id: Option<String>,
    /// `AWS_SECRET_ACCESS_KEY`.
    pub secret_access_key: Option<String>,
    /// `AWS_SESSION_TOKEN`.
    pub session_token: Option<String>,
    /// `GITHUB_ACTIONS`.
    pub automation_flag: Option<String>,
}

impl EnvSnapshot {
    /// Capture the publisher's variables from `env`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use stork_publisher::config::EnvSnapshot;
    ///
    /// let env = HashMap::from([("GITHUB_ACTIONS".to_owned(), "true".to_owned())]);
    /// let snapshot = EnvSnapshot::capture(&env);
    /// assert!(snapshot.in_automation());
    /// assert!(snapshot.access_key_id.is_none());
    /// ```
    pub fn capture(env: &dyn Environment) -> Self {
        Self {
            access_key_id: env.var(ACCESS_KEY_ID_VAR),
            secret_access_key: env.var(SECRET_ACCESS_KEY_VAR),
            session_token: env.var(SESSION_TOKEN_VAR),
            automation_flag: env.var(AUTOMATION_FLAG_VAR),
        }
    }

    /// Whether the automation flag is present and truthy.
    #[must_use]
    pub fn in_automation(&self) -> bool {
        self.automation_flag.as_deref().is_some_and(is_truthy)
    }
}

impl std::fmt::Debug for EnvSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSnapshot")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("automation_flag", &self.automation_flag)
            .finish()
    }
}

/// Interpret a boolean-ish environment value.
///
/// Empty strings and `0`, `false`, `no`, `off` (any case) are falsy;
/// anything else is truthy.
///
/// # Examples
///
/// ```
/// use stork_publisher::config::is_truthy;
///
/// assert!(is_truthy("true"));
/// assert!(is_truthy("1"));
/// assert!(!is_truthy("False"));
/// assert!(!is_truthy("  "));
/// ```
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !["0", "false", "no", "off"]
            .iter()
            .any(|falsy| value.eq_ignore_ascii_case(falsy))
}

/// Everything the publisher needs besides the gate inputs.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Project root holding the marker file and build outputs.
    pub project_root: Utf8PathBuf,
    /// Bucket to publish into.
    pub bucket: String,
    /// CDN distribution to invalidate.
    pub distribution_id: String,
    /// Region of the bucket.
    pub region: String,
    /// Custom S3-compatible endpoint, if any.
    pub endpoint_url: Option<String>,
    /// Retry policy for store and CDN requests.
    pub retry: RetryPolicy,
    /// What to do when an upload fails.
    pub failure_policy: FailurePolicy,
    /// The artefacts to publish.
    pub manifest: Manifest,
}

impl PublishConfig {
    /// Defaults for a project rooted at `project_root`.
    #[must_use]
    pub fn new(project_root: Utf8PathBuf) -> Self {
        Self {
            project_root,
            bucket: DEFAULT_BUCKET.to_owned(),
            distribution_id: DEFAULT_DISTRIBUTION_ID.to_owned(),
            region: DEFAULT_REGION.to_owned(),
            endpoint_url: None,
            retry: RetryPolicy::default(),
            failure_policy: FailurePolicy::default(),
            manifest: Manifest::release(),
        }
    }

    /// Layer a parsed config file over the current values.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidConfig`] if the file's settings or
    /// artefact list are invalid.
    pub fn apply_file(mut self, file: ConfigFile, source: &Utf8Path) -> Result<Self> {
        let invalid = |reason: String| PublishError::InvalidConfig {
            path: source.to_owned(),
            reason,
        };

        if let Some(settings) = file.publish {
            if let Some(bucket) = settings.bucket {
                self.bucket = bucket;
            }
            if let Some(distribution_id) = settings.distribution_id {
                self.distribution_id = distribution_id;
            }
            if let Some(region) = settings.region {
                self.region = region;
            }
            if settings.endpoint_url.is_some() {
                self.endpoint_url = settings.endpoint_url;
            }
            if let Some(max_attempts) = settings.max_attempts {
                self.retry = self
                    .retry
                    .with_max_attempts(max_attempts)
                    .map_err(|e| invalid(e.to_owned()))?;
            }
        }

        let mut templates = *self.manifest.templates();
        for (category, section) in file.categories {
            templates.set(category, DestinationTemplate::new(section.bare_alias));
        }

        self.manifest = match file.artefact {
            Some(entries) => {
                let artefacts = entries.into_iter().map(ArtefactEntry::into_artefact).collect();
                Manifest::new(artefacts, templates).map_err(|e| invalid(e.to_string()))?
            }
            None => self.manifest.with_templates(templates),
        };

        Ok(self)
    }
}

/// Parsed contents of `publish.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Destination and retry settings.
    pub publish: Option<PublishSection>,
    /// Per-category template overrides.
    #[serde(default)]
    pub categories: BTreeMap<ArtefactCategory, CategorySection>,
    /// Replacement artefact list.
    pub artefact: Option<Vec<ArtefactEntry>>,
}

/// The `[publish]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSection {
    /// Bucket override.
    pub bucket: Option<String>,
    /// Distribution override.
    pub distribution_id: Option<String>,
    /// Region override.
    pub region: Option<String>,
    /// Custom endpoint.
    pub endpoint_url: Option<String>,
    /// Attempts per request.
    pub max_attempts: Option<u32>,
}

/// A `[categories.<name>]` table.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySection {
    /// Whether the bare root alias is published.
    pub bare_alias: bool,
}

/// One `[[artefact]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtefactEntry {
    /// Logical name.
    pub name: String,
    /// Category.
    pub category: ArtefactCategory,
    /// Local path relative to the project root; defaults from the category.
    pub path: Option<Utf8PathBuf>,
    /// MIME type.
    pub content_type: Option<String>,
}

impl ArtefactEntry {
    fn into_artefact(self) -> Artefact {
        let artefact = Artefact::new(self.name, self.category, self.content_type);
        match self.path {
            Some(path) => artefact.with_local_path(path),
            None => artefact,
        }
    }
}

/// Parse a config file's contents.
///
/// # Errors
///
/// Returns [`PublishError::InvalidConfig`] if the TOML is malformed or has
/// unknown keys.
pub fn parse_config(contents: &str, source: &Utf8Path) -> Result<ConfigFile> {
    toml::from_str(contents).map_err(|e| PublishError::InvalidConfig {
        path: source.to_owned(),
        reason: e.to_string(),
    })
}

/// Load the config file, if any.
///
/// An explicit path must exist. Without one, `<project_root>/publish.toml` is
/// used when present and silently skipped otherwise.
///
/// # Errors
///
/// Returns an error if an explicit file is missing or any file is invalid.
pub fn load_config_file(
    project_root: &Utf8Path,
    explicit: Option<&Utf8Path>,
) -> Result<Option<(Utf8PathBuf, ConfigFile)>> {
    let path = match explicit {
        Some(path) => path.to_owned(),
        None => {
            let candidate = project_root.join(CONFIG_FILE_NAME);
            if !candidate.is_file() {
                log::debug!("no {CONFIG_FILE_NAME} in {project_root}; using built-in manifest");
                return Ok(None);
            }
            candidate
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| PublishError::InvalidConfig {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let file = parse_config(&contents, &path)?;
    log::debug!("loaded configuration from {path}");
    Ok(Some((path, file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn source() -> &'static Utf8Path {
        Utf8Path::new("publish.toml")
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[rstest]
    #[case("true", true)]
    #[case("1", true)]
    #[case("yes", true)]
    #[case("false", false)]
    #[case("FALSE", false)]
    #[case("0", false)]
    #[case("off", false)]
    #[case("", false)]
    fn truthiness(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_truthy(value), expected);
    }

    #[test]
    fn capture_reads_every_variable() {
        let snapshot = EnvSnapshot::capture(&env(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", "token"),
            ("GITHUB_ACTIONS", "true"),
        ]));
        assert_eq!(snapshot.access_key_id.as_deref(), Some("AKID"));
        assert_eq!(snapshot.secret_access_key.as_deref(), Some("secret"));
        assert_eq!(snapshot.session_token.as_deref(), Some("token"));
        assert!(snapshot.in_automation());
    }

    #[test]
    fn capture_from_system_environment() {
        temp_env::with_vars(
            [
                ("AWS_ACCESS_KEY_ID", Some("AKID-SYSTEM")),
                ("AWS_SECRET_ACCESS_KEY", None),
                ("GITHUB_ACTIONS", Some("false")),
            ],
            || {
                let snapshot = EnvSnapshot::capture(&SystemEnvironment);
                assert_eq!(snapshot.access_key_id.as_deref(), Some("AKID-SYSTEM"));
                assert!(snapshot.secret_access_key.is_none());
                assert!(!snapshot.in_automation());
            },
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let snapshot = EnvSnapshot::capture(&env(&[("AWS_SECRET_ACCESS_KEY", "hunter2")]));
        assert!(!format!("{snapshot:?}").contains("hunter2"));
    }

    #[test]
    fn defaults_target_the_release_bucket() {
        let config = PublishConfig::new(Utf8PathBuf::from("/srv/stork"));
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.distribution_id, DEFAULT_DISTRIBUTION_ID);
        assert_eq!(config.manifest, Manifest::release());
    }

    #[test]
    fn file_overrides_settings_and_templates() {
        let file = parse_config(
            concat!(
                "[publish]\n",
                "bucket = \"staging-bucket\"\n",
                "max_attempts = 2\n",
                "[categories.data-file]\n",
                "bare_alias = true\n",
            ),
            source(),
        )
        .expect("valid config");
        let config = PublishConfig::new(Utf8PathBuf::from("/srv/stork"))
            .apply_file(file, source())
            .expect("config applies");

        assert_eq!(config.bucket, "staging-bucket");
        assert_eq!(config.retry.max_attempts(), 2);
        assert!(config.manifest.template_for(ArtefactCategory::DataFile).bare_alias());
        assert_eq!(config.manifest.len(), Manifest::release().len());
    }

    #[test]
    fn file_can_replace_the_artefact_list() {
        let file = parse_config(
            concat!(
                "[[artefact]]\n",
                "name = \"stork.js\"\n",
                "category = \"web-asset\"\n",
                "path = \"dist/stork.js\"\n",
                "content_type = \"text/javascript\"\n",
            ),
            source(),
        )
        .expect("valid config");
        let config = PublishConfig::new(Utf8PathBuf::from("/srv/stork"))
            .apply_file(file, source())
            .expect("config applies");

        let artefacts = config.manifest.artefacts();
        assert_eq!(artefacts.len(), 1);
        assert_eq!(artefacts.first().map(Artefact::local_path), Some(Utf8Path::new("dist/stork.js")));
    }

    #[test]
    fn invalid_artefact_list_is_a_config_error() {
        let file = parse_config(
            "[[artefact]]\nname = \"stork.js\"\ncategory = \"web-asset\"\n",
            source(),
        )
        .expect("valid TOML");
        let err = PublishConfig::new(Utf8PathBuf::from("/srv/stork"))
            .apply_file(file, source())
            .expect_err("web asset without content type must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
        assert!(err.to_string().contains("content type"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let file = parse_config("[publish]\nmax_attempts = 0\n", source()).expect("valid TOML");
        let result = PublishConfig::new(Utf8PathBuf::from("/srv/stork")).apply_file(file, source());
        assert!(matches!(result, Err(PublishError::InvalidConfig { .. })));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = parse_config("[publish]\nbukket = \"typo\"\n", source());
        assert!(matches!(result, Err(PublishError::InvalidConfig { .. })));
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let loaded = load_config_file(&root, None).expect("absent file is fine");
        assert!(loaded.is_none());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let explicit = root.join("custom.toml");
        let result = load_config_file(&root, Some(&explicit));
        assert!(matches!(result, Err(PublishError::InvalidConfig { .. })));
    }

    #[test]
    fn default_file_is_picked_up_from_the_project_root() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        std::fs::write(root.join(CONFIG_FILE_NAME), "[publish]\nregion = \"eu-west-1\"\n")
            .expect("write config");
        let (path, file) = load_config_file(&root, None)
            .expect("file loads")
            .expect("file present");
        assert_eq!(path, root.join(CONFIG_FILE_NAME));
        assert_eq!(
            file.publish.and_then(|p| p.region).as_deref(),
            Some("eu-west-1")
        );
    }
}
