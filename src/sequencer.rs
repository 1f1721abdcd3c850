//! Runs every group of an extracted bundle and sends the final verdict.

use crate::error::Result;
use crate::fetcher::download_and_extract_tar;
use crate::script_manifest::{ScriptGroup, ScriptManifest};
use crate::script_runner::{run_scripts, RunContext};
use crate::status::{failed_summary, SignalStatus, StatusSignal, ALL_SCRIPTS_PASSED};
use strum::IntoEnumIterator;
use tracing::{error, info};

/// Counters for the final status message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunTally {
    pub attempted: u32,
    pub failed: u32,
}

impl RunTally {
    pub fn record_group(&mut self, attempted: usize, failed: u32) {
        let attempted = u32::try_from(attempted).unwrap_or(u32::MAX);
        self.attempted = self.attempted.saturating_add(attempted);
        self.failed = self.failed.saturating_add(failed);
    }

    /// The aggregate signal sent once every group has run.
    pub fn final_signal(&self) -> StatusSignal {
        if self.failed == 0 {
            StatusSignal::new(SignalStatus::Ok).with_error(ALL_SCRIPTS_PASSED)
        } else {
            StatusSignal::new(SignalStatus::Failed).with_error(failed_summary(self.failed))
        }
    }
}

/// What the caller learns about a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub tally: RunTally,
    pub status: SignalStatus,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.status == SignalStatus::Ok
    }
}

/// Read `index.json` from `ctx.scripts_dir` and run every group in order.
///
/// A missing or malformed manifest fails before any signal is sent. A
/// TESTING signal precedes all groups when the manifest lists a testing
/// group, even an empty one.
pub fn run_scripts_from_metadata(ctx: &RunContext<'_>) -> Result<RunSummary> {
    let manifest = ScriptManifest::load(&ctx.scripts_dir).inspect_err(|e| {
        error!(dir = %ctx.scripts_dir.display(), error = %e, "cannot load manifest");
    })?;
    info!(
        version = manifest.version(),
        scripts = manifest.total_scripts(),
        "loaded script manifest"
    );

    if manifest.has_testing() {
        ctx.controller
            .signal(&StatusSignal::new(SignalStatus::Testing))?;
    }

    let mut tally = RunTally::default();
    for group in ScriptGroup::iter() {
        let scripts = manifest.scripts(group);
        if scripts.is_empty() {
            continue;
        }
        info!(%group, count = scripts.len(), "running script group");
        let failed = run_scripts(ctx, scripts)?;
        tally.record_group(scripts.len(), failed);
    }

    let verdict = tally.final_signal();
    info!(
        status = %verdict.status,
        attempted = tally.attempted,
        failed = tally.failed,
        "all script groups finished"
    );
    ctx.controller.signal(&verdict)?;

    Ok(RunSummary {
        tally,
        status: verdict.status,
    })
}

/// The whole pipeline: fetch and unpack the bundle, then run it.
///
/// A failed download or extraction stops the run before any signal.
pub fn download_and_run(ctx: &RunContext<'_>, bundle_url: &str) -> Result<RunSummary> {
    download_and_extract_tar(ctx.controller, bundle_url, &ctx.scripts_dir)?;
    run_scripts_from_metadata(ctx)
}
