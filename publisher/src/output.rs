//! Operator-facing console output.
//!
//! Progress lines go to stderr, separate from log records, so they survive
//! any log filter and can be silenced with `--quiet`. This module also
//! renders the dry-run plan.

use crate::artefact::Manifest;
use crate::destination::{Destination, PathResolver};
use crate::pipeline::{PipelineState, PublishReport};
use crate::release_ref::ReleaseRef;
use crate::uploader::UploadOutcome;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

/// Site announced once a release is live.
pub const HOMEPAGE: &str = "https://stork-search.net";

/// Write a line to stderr, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Announce the upload phase.
///
/// # Examples
///
/// ```
/// use stork_publisher::output::uploading_message;
/// use stork_publisher::release_ref::ReleaseRef;
///
/// let release = ReleaseRef::try_from("v1.2.5").expect("valid");
/// assert_eq!(
///     uploading_message(11, "files.stork-search.net", &release),
///     "Uploading 11 files to files.stork-search.net/releases/v1.2.5 ..."
/// );
/// ```
#[must_use]
pub fn uploading_message(count: usize, bucket: &str, release: &ReleaseRef) -> String {
    format!(
        "Uploading {count} files to {bucket}/{}/{release} ...",
        crate::destination::RELEASES_PREFIX
    )
}

/// Report how many artefacts are done.
#[must_use]
pub fn progress_message(done: usize, total: usize) -> String {
    format!("{done} of {total} files uploaded.")
}

/// Describe one upload outcome.
#[must_use]
pub fn outcome_message(outcome: &UploadOutcome) -> String {
    outcome.error.as_ref().map_or_else(
        || format!("Uploaded {}", outcome.destination),
        |failure| format!("Failed to upload {}: {}", outcome.destination, failure.message),
    )
}

/// Line printed once the cache purge succeeds.
pub const INVALIDATED_MESSAGE: &str = "Cache invalidated.";

/// Final line for a finished run.
#[must_use]
pub fn summary_message(report: &PublishReport) -> String {
    let failed = report.failures().count();
    match report.state {
        PipelineState::Done => format!(
            "Done. Release {} is live. Visit {HOMEPAGE}",
            report.release
        ),
        PipelineState::Aborted => format!(
            "Publish of {} aborted after {} upload(s); cache not invalidated.",
            report.release,
            report.uploads.len()
        ),
        PipelineState::PartiallyFailed => format!(
            "Publish of {} finished with {failed} of {} upload(s) failed.",
            report.release,
            report.uploads.len()
        ),
        _ => format!("Publish of {} failed.", report.release),
    }
}

/// One artefact in a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedArtefact {
    /// Logical name.
    pub name: String,
    /// Absolute path that would be read.
    pub source: Utf8PathBuf,
    /// Whether the file exists right now.
    pub present: bool,
    /// Where it would be uploaded.
    pub destinations: Vec<Destination>,
}

/// What a publish would do, computed without network access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunPlan {
    /// Release being planned.
    pub release: ReleaseRef,
    /// Distribution that would be purged.
    pub distribution_id: String,
    /// Per-artefact plan, in manifest order.
    pub artefacts: Vec<PlannedArtefact>,
}

impl DryRunPlan {
    /// Resolve every artefact in `manifest` for `release`.
    #[must_use]
    pub fn new(
        resolver: &PathResolver,
        manifest: &Manifest,
        release: &ReleaseRef,
        project_root: &Utf8Path,
        distribution_id: &str,
    ) -> Self {
        let artefacts = resolver
            .plan(manifest, release)
            .into_iter()
            .map(|(artefact, destinations)| {
                let source = project_root.join(artefact.local_path());
                PlannedArtefact {
                    name: artefact.logical_name().to_owned(),
                    present: source.is_file(),
                    source,
                    destinations,
                }
            })
            .collect();
        Self {
            release: release.clone(),
            distribution_id: distribution_id.to_owned(),
            artefacts,
        }
    }

    /// Number of objects that would be written.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.artefacts.iter().map(|a| a.destinations.len()).sum()
    }

    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - nothing will be uploaded or invalidated".to_owned(),
            String::new(),
            format!("Release: {}", self.release),
            format!("Distribution: {}", self.distribution_id),
            format!(
                "Objects: {} from {} file(s)",
                self.object_count(),
                self.artefacts.len()
            ),
        ];

        for artefact in &self.artefacts {
            lines.push(String::new());
            let marker = if artefact.present { "" } else { " (missing)" };
            lines.push(format!("{}{marker}", artefact.source));
            for destination in &artefact.destinations {
                match &destination.content_type {
                    Some(content_type) => lines.push(format!("  -> {destination} [{content_type}]")),
                    None => lines.push(format!("  -> {destination}")),
                }
            }
        }

        lines.join("\n")
    }
}
