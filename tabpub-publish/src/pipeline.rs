//! One pull-request run, end to end.
//!
//! 1. Build the registry from the workbook directory (fatal on error).
//! 2. List the pull request's changed files (fatal on error).
//! 3. Drop files missing from the checkout; stop here if none remain.
//! 4. Resolve candidates and run the publish loop.
//! 5. Deliver the report, best effort.

use std::path::PathBuf;

use tabpub_core::{registry, DuplicatePolicy};

use crate::changeset::resolve_candidates;
use crate::error::PipelineError;
use crate::gateway::PublishGateway;
use crate::host::{PullRequestHost, PullRequestId};
use crate::orchestrator::Orchestrator;
use crate::report::{OutcomeReport, ReportSink};

/// Inputs of a run that are not collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Root of the repository checkout; changed-file paths are relative to it.
    pub checkout_root: PathBuf,
    /// Managed directory, relative to `checkout_root`. Holds the fragments and
    /// filters the change set.
    pub workbook_dir: String,
    pub pull_request: PullRequestId,
    pub duplicates: DuplicatePolicy,
}

impl RunConfig {
    pub fn new(
        checkout_root: impl Into<PathBuf>,
        workbook_dir: impl Into<String>,
        pr: PullRequestId,
    ) -> Self {
        Self {
            checkout_root: checkout_root.into(),
            workbook_dir: workbook_dir.into(),
            pull_request: pr,
            duplicates: DuplicatePolicy::default(),
        }
    }

    fn fragment_root(&self) -> PathBuf {
        self.checkout_root.join(&self.workbook_dir)
    }
}

/// How a run ended, when it did not hit a fatal error.
#[derive(Debug)]
pub enum RunOutcome {
    /// The pull request changed no files that still exist.
    NoChanges,
    Completed {
        report: OutcomeReport,
        /// Whether the sink accepted the report.
        delivered: bool,
    },
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        match self {
            RunOutcome::NoChanges => true,
            RunOutcome::Completed { report, .. } => report.success(),
        }
    }

    /// Process exit code: 0 on success, 1 when any workbook failed.
    pub fn exit_code(&self) -> u8 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Run the full publish flow for one pull request.
pub fn run<H, G, S>(
    config: &RunConfig,
    host: &H,
    gateway: &mut G,
    sink: &mut S,
) -> Result<RunOutcome, PipelineError>
where
    H: PullRequestHost + ?Sized,
    G: PublishGateway + ?Sized,
    S: ReportSink + ?Sized,
{
    tracing::info!(workbook_dir = %config.workbook_dir, "building workbook registry");
    let registry = registry::build_registry_with(&config.fragment_root(), config.duplicates)?;

    let mut changeset = host
        .list_changed_files(config.pull_request)
        .map_err(PipelineError::ChangeSet)?;
    let dropped = changeset.retain_existing(&config.checkout_root);
    if changeset.is_empty() {
        tracing::info!(dropped, "no file changes detected");
        return Ok(RunOutcome::NoChanges);
    }

    let candidates = resolve_candidates(&changeset, &config.workbook_dir);
    tracing::info!(
        changed = changeset.len(),
        candidates = ?candidates.iter().map(|c| c.file_name.as_str()).collect::<Vec<_>>(),
        "added & modified workbook files"
    );

    let report =
        Orchestrator::new(gateway, config.checkout_root.clone()).run(&registry, &candidates);

    let delivered = if report.is_empty() {
        tracing::info!("no workbook candidates; nothing to report");
        false
    } else {
        match sink.publish(&report.render()) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to deliver report");
                false
            }
        }
    };

    Ok(RunOutcome::Completed { report, delivered })
}
