//! Publish pipeline orchestration.
//!
//! The pipeline ties the other components together: the precondition gate
//! clears the run, the path resolver expands the manifest, the uploader
//! sends each artefact to each destination, and the cache invalidator fires
//! once at the end. Progress lines are written to the supplied stderr
//! handle; the structured result comes back as a [`PublishReport`].

use crate::cdn::{CacheInvalidator, CdnClient, Clock, Invalidation, SystemClock};
use crate::config::PublishConfig;
use crate::destination::PathResolver;
use crate::error::Result;
use crate::gate::{ClearedRun, GateInputs, PreconditionGate};
use crate::output::{
    INVALIDATED_MESSAGE, outcome_message, progress_message, summary_message, uploading_message,
    write_stderr_line,
};
use crate::release_ref::ReleaseRef;
use crate::retry::{Sleeper, ThreadSleeper};
use crate::storage::ObjectStore;
use crate::uploader::{FailureDetail, UploadOutcome, Uploader};
use serde::Serialize;
use std::io::Write;

/// Where a pipeline run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    /// Nothing has happened yet.
    NotStarted,
    /// Precondition checks are running.
    Gating,
    /// A precondition or the invalidation failed.
    Failed,
    /// Artefacts are being uploaded.
    Uploading,
    /// An upload failed and the rest of the run was abandoned.
    Aborted,
    /// Some uploads failed but the run carried on.
    PartiallyFailed,
    /// The cache purge is in flight.
    Invalidating,
    /// Every upload and the purge succeeded.
    Done,
}

/// What to do when an upload fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failure and skip the invalidation.
    #[default]
    AbortOnFirst,
    /// Attempt everything, invalidate anyway, and report the failures.
    ContinueAndReport,
}

/// How the cache purge went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum InvalidationOutcome {
    /// The run ended before the purge.
    Skipped,
    /// The CDN accepted the purge.
    Completed(Invalidation),
    /// The purge request failed.
    Failed(FailureDetail),
}

/// Everything a run attempted and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Release that was published.
    pub release: ReleaseRef,
    /// Bucket written to.
    pub bucket: String,
    /// Distribution purged.
    pub distribution_id: String,
    /// Final state.
    pub state: PipelineState,
    /// Every state the run passed through, in order.
    pub transitions: Vec<PipelineState>,
    /// One entry per destination attempted, in order.
    pub uploads: Vec<UploadOutcome>,
    /// Result of the purge.
    pub invalidation: InvalidationOutcome,
}

impl PublishReport {
    /// Whether everything succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Uploads that failed.
    pub fn failures(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.uploads.iter().filter(|outcome| !outcome.success())
    }
}

struct StateLog {
    transitions: Vec<PipelineState>,
}

impl StateLog {
    fn new() -> Self {
        Self {
            transitions: vec![PipelineState::NotStarted],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        log::debug!("pipeline state: {:?} -> {next:?}", self.current());
        self.transitions.push(next);
    }

    fn current(&self) -> PipelineState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(PipelineState::NotStarted)
    }
}

/// Runs one publish from gate to purge.
pub struct PublishPipeline<'a> {
    config: &'a PublishConfig,
    store: &'a dyn ObjectStore,
    cdn: &'a dyn CdnClient,
    sleeper: &'a dyn Sleeper,
    clock: &'a dyn Clock,
    quiet: bool,
}

impl<'a> PublishPipeline<'a> {
    /// Create a pipeline over the given store and CDN.
    #[must_use]
    pub fn new(
        config: &'a PublishConfig,
        store: &'a dyn ObjectStore,
        cdn: &'a dyn CdnClient,
    ) -> Self {
        Self {
            config,
            store,
            cdn,
            sleeper: &ThreadSleeper,
            clock: &SystemClock,
            quiet: false,
        }
    }

    /// Replace the sleeper used between retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock used for caller references.
    #[must_use]
    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Suppress progress lines.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Gate the run, then publish.
    ///
    /// # Errors
    ///
    /// Returns the gate's error when a precondition fails. Nothing is
    /// uploaded or invalidated in that case. Failures after the gate are
    /// reported in the returned [`PublishReport`] instead.
    pub fn execute(
        &self,
        gate: &PreconditionGate,
        inputs: &GateInputs<'_>,
        stderr: &mut dyn Write,
    ) -> Result<PublishReport> {
        let mut states = StateLog::new();
        states.advance(PipelineState::Gating);
        let cleared = gate.check(inputs).inspect_err(|err| {
            log::debug!("pipeline state: Gating -> Failed ({err})");
        })?;
        Ok(self.publish(states, &cleared, stderr))
    }

    /// Publish a run that has already cleared the gate.
    ///
    /// A [`ClearedRun`] only comes out of [`PreconditionGate::check`], so the
    /// report records the gate as passed: its transitions start with
    /// `NotStarted`, `Gating`, `Uploading`, the same as [`Self::execute`].
    pub fn run(&self, cleared: &ClearedRun, stderr: &mut dyn Write) -> PublishReport {
        let mut states = StateLog::new();
        states.advance(PipelineState::Gating);
        self.publish(states, cleared, stderr)
    }

    fn publish(
        &self,
        mut states: StateLog,
        cleared: &ClearedRun,
        stderr: &mut dyn Write,
    ) -> PublishReport {
        states.advance(PipelineState::Uploading);

        let release = cleared.release();
        let (uploads, aborted) = self.upload_all(release, stderr);

        let failed = uploads.iter().any(|outcome| !outcome.success());
        let invalidation = if aborted {
            states.advance(PipelineState::Aborted);
            InvalidationOutcome::Skipped
        } else {
            if failed {
                states.advance(PipelineState::PartiallyFailed);
            }
            states.advance(PipelineState::Invalidating);
            let invalidation = self.invalidate(stderr);
            let end = match (&invalidation, failed) {
                (InvalidationOutcome::Failed(_), _) => PipelineState::Failed,
                (_, true) => PipelineState::PartiallyFailed,
                (_, false) => PipelineState::Done,
            };
            states.advance(end);
            invalidation
        };

        let report = PublishReport {
            release: release.clone(),
            bucket: self.config.bucket.clone(),
            distribution_id: self.config.distribution_id.clone(),
            state: states.current(),
            transitions: states.transitions,
            uploads,
            invalidation,
        };
        self.progress(stderr, summary_message(&report));
        report
    }

    fn upload_all(
        &self,
        release: &ReleaseRef,
        stderr: &mut dyn Write,
    ) -> (Vec<UploadOutcome>, bool) {
        let manifest = &self.config.manifest;
        let plan = PathResolver::new(&self.config.bucket).plan(manifest, release);
        let total = plan.len();
        let uploader = Uploader::new(
            self.store,
            &self.config.project_root,
            self.config.retry,
            self.sleeper,
        );
        let abort_on_failure = self.config.failure_policy == FailurePolicy::AbortOnFirst;

        self.progress(stderr, uploading_message(total, &self.config.bucket, release));

        let mut uploads = Vec::new();
        for (index, (artefact, destinations)) in plan.into_iter().enumerate() {
            for destination in &destinations {
                log::debug!("{} -> {destination}", artefact.logical_name());
            }

            let outcomes: Vec<UploadOutcome> = match uploader.load(artefact.local_path()) {
                Ok(payload) => {
                    let mut outcomes = Vec::with_capacity(destinations.len());
                    for destination in &destinations {
                        let outcome = uploader.send(&payload, destination);
                        let stop = abort_on_failure && !outcome.success();
                        outcomes.push(outcome);
                        if stop {
                            break;
                        }
                    }
                    outcomes
                }
                Err(err) => {
                    log::error!("{err}");
                    let skipped = if abort_on_failure { 1 } else { destinations.len() };
                    destinations
                        .into_iter()
                        .take(skipped)
                        .map(|destination| UploadOutcome::unreadable(destination, &err))
                        .collect()
                }
            };

            let artefact_failed = outcomes.iter().any(|outcome| !outcome.success());
            for outcome in outcomes.iter().filter(|outcome| !outcome.success()) {
                self.progress(stderr, outcome_message(outcome));
            }
            uploads.extend(outcomes);

            if artefact_failed && abort_on_failure {
                return (uploads, true);
            }
            if !artefact_failed {
                self.progress(stderr, progress_message(index + 1, total));
            }
        }

        (uploads, false)
    }

    fn invalidate(&self, stderr: &mut dyn Write) -> InvalidationOutcome {
        let invalidator = CacheInvalidator::new(
            self.cdn,
            &self.config.distribution_id,
            self.clock,
            self.config.retry,
            self.sleeper,
        );
        match invalidator.invalidate() {
            Ok(invalidation) => {
                self.progress(stderr, INVALIDATED_MESSAGE);
                InvalidationOutcome::Completed(invalidation)
            }
            Err(err) => {
                log::error!("{err}");
                let detail = FailureDetail::from(&err);
                self.progress(stderr, format!("Cache invalidation failed: {}", detail.message));
                InvalidationOutcome::Failed(detail)
            }
        }
    }

    fn progress(&self, stderr: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
