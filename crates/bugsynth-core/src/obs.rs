//! Structured observability hooks for the mining pipeline.
//!
//! - [`bug_span`] tags everything logged while one bug is processed
//! - `emit_*` functions log the per-bug and export lifecycle at `info!`,
//!   failures at `error!`

use std::path::Path;

use tracing::{error, info};

/// Span tagged with the bug identity.
///
/// Attach it to async work with `tracing::Instrument` rather than entering
/// it, so it is not held across `.await` points.
///
/// ```ignore
/// process(bug).instrument(bug_span("Lang", "1")).await;
/// // every event now carries project=Lang bug_id=1
/// ```
pub fn bug_span(project: &str, bug_id: &str) -> tracing::Span {
    tracing::info_span!("bugsynth.bug", project = %project, bug_id = %bug_id)
}

/// Emit event: processing of a bug started.
pub fn emit_bug_started(project: &str, bug_id: &str) {
    info!(event = "bug.started", project = %project, bug_id = %bug_id);
}

/// Emit event: a session was synthesized for a bug.
pub fn emit_bug_finished(project: &str, bug_id: &str, test_outcomes: usize, log_entries: usize) {
    info!(
        event = "bug.finished",
        project = %project,
        bug_id = %bug_id,
        test_outcomes = test_outcomes,
        log_entries = log_entries,
    );
}

/// Emit event: a bug was skipped because one of its steps failed.
///
/// `error` is rendered with the alternate formatter so that anyhow chains
/// print every cause.
pub fn emit_bug_failed(project: &str, bug_id: &str, error: &dyn std::fmt::Display) {
    error!(
        event = "bug.failed",
        project = %project,
        bug_id = %bug_id,
        error = %format!("{error:#}"),
    );
}

/// Emit event: a dataset file was written.
pub fn emit_export_written(path: &Path, sessions: usize) {
    info!(event = "export.written", path = %path.display(), sessions = sessions);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bug_span_create() {
        let _entered = bug_span("Lang", "1").entered();
        emit_bug_started("Lang", "1");
        emit_bug_failed("Lang", "1", &"checkout failed");
    }
}
