//! CLI argument definitions for the Stork release publisher.
//!
//! This module defines the command-line interface using clap and the
//! mapping from parsed flags onto [`PublishConfig`] and [`GateRequirements`].
//! The binary entrypoint only orchestrates.

use crate::config::{PublishConfig, load_config_file};
use crate::error::{PublishError, Result};
use crate::gate::GateRequirements;
use crate::pipeline::FailurePolicy;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

/// Publish Stork release artefacts to the CDN.
#[derive(Parser, Debug)]
#[command(name = "stork-publish")]
#[command(version, about)]
#[command(long_about = concat!(
    "Publish Stork release artefacts to the CDN.\n\n",
    "Uploads the web bundle, platform binaries, and sample index to ",
    "releases/<RELEASE_REF>/ and releases/latest/ in the release bucket, ",
    "then invalidates the CDN cache once.\n\n",
    "Run from the Stork project root with AWS_ACCESS_KEY_ID and ",
    "AWS_SECRET_ACCESS_KEY set. Outside the release workflow, pass ",
    "--allow-local.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Publish a tagged release from the workflow:\n",
    "    $ stork-publish v1.2.5\n\n",
    "  Preview the destinations without credentials or network:\n",
    "    $ stork-publish --dry-run v1.2.5\n\n",
    "  Publish from a workstation, carrying on past failures:\n",
    "    $ stork-publish --allow-local --keep-going v1.2.5\n\n",
    "EXIT CODES:\n",
    "  0  everything uploaded and the cache was invalidated\n",
    "  1  a precondition or the configuration was rejected; nothing was sent\n",
    "  2  the publish started but did not complete",
))]
pub struct Cli {
    /// Release ref naming the directory files are uploaded to (e.g. v1.2.5).
    #[arg(value_name = "RELEASE_REF")]
    pub release_ref: Option<String>,

    /// Project root holding the marker file and build outputs [default: current directory].
    #[arg(short = 'C', long, value_name = "DIR")]
    pub project_root: Option<Utf8PathBuf>,

    /// Configuration file [default: <project root>/publish.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Override the destination bucket.
    #[arg(long, value_name = "BUCKET")]
    pub bucket: Option<String>,

    /// Override the CDN distribution to invalidate.
    #[arg(long, value_name = "ID")]
    pub distribution_id: Option<String>,

    /// Override the bucket region.
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Send storage requests to an S3-compatible endpoint.
    #[arg(long, value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Attempts per request before giving up on transient failures.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Upload every artefact even after a failure, then invalidate.
    #[arg(long)]
    pub keep_going: bool,

    /// Allow publishing outside the release workflow.
    #[arg(long)]
    pub allow_local: bool,

    /// Print the planned destinations and exit without uploading.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report (or dry-run plan) as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// The failure policy selected by `--keep-going`.
    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        if self.keep_going {
            FailurePolicy::ContinueAndReport
        } else {
            FailurePolicy::AbortOnFirst
        }
    }

    /// The precondition checks this invocation needs.
    #[must_use]
    pub fn gate_requirements(&self) -> GateRequirements {
        if self.dry_run {
            GateRequirements::DRY_RUN
        } else if self.allow_local {
            GateRequirements::PUBLISH.allow_local()
        } else {
            GateRequirements::PUBLISH
        }
    }

    /// Default log filter for the requested verbosity.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// The project root, falling back to `cwd`.
    #[must_use]
    pub fn project_root_or(&self, cwd: &Utf8Path) -> Utf8PathBuf {
        self.project_root
            .as_ref()
            .map_or_else(|| cwd.to_owned(), |root| cwd.join(root))
    }

    /// Assemble the configuration: defaults, then the config file, then
    /// flags.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidConfig`] if the config file is missing
    /// (when named explicitly) or invalid.
    pub fn resolve_config(&self, project_root: &Utf8Path) -> Result<PublishConfig> {
        let mut config = PublishConfig::new(project_root.to_owned());

        let explicit = self.config.as_deref().map(|path| project_root.join(path));
        if let Some((path, file)) = load_config_file(project_root, explicit.as_deref())? {
            config = config.apply_file(file, &path)?;
        }

        if let Some(bucket) = &self.bucket {
            config.bucket.clone_from(bucket);
        }
        if let Some(distribution_id) = &self.distribution_id {
            config.distribution_id.clone_from(distribution_id);
        }
        if let Some(region) = &self.region {
            config.region.clone_from(region);
        }
        if self.endpoint_url.is_some() {
            config.endpoint_url.clone_from(&self.endpoint_url);
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry = config.retry.with_max_attempts(max_attempts).map_err(|reason| {
                PublishError::InvalidConfig {
                    path: Utf8PathBuf::from("--max-attempts"),
                    reason: reason.to_owned(),
                }
            })?;
        }
        config.failure_policy = self.failure_policy();

        Ok(config)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
