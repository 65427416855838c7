//! Mining pipeline: bug database in, debug sessions out.

use std::time::Instant;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use bugsynth_core::export::append_bug_report;
use bugsynth_core::model::DebugSession;
use bugsynth_core::obs::{bug_span, emit_bug_failed, emit_bug_finished, emit_bug_started};
use bugsynth_core::synth::synthesize_session;

use crate::config::PipelineConfig;
use crate::database::{BugDatabase, CheckoutVersion};

/// A bug that was skipped, with the rendered error chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BugFailure {
    pub project: String,
    pub bug_id: String,
    pub error: String,
}

/// Result of one mining run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Unique id of this run.
    pub run_id: String,

    /// Synthesized sessions, in processing order.
    pub sessions: Vec<DebugSession>,

    /// Bugs that could not be processed.
    pub failures: Vec<BugFailure>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn processed_count(&self) -> usize {
        self.sessions.len() + self.failures.len()
    }
}

/// Mining pipeline orchestrator.
pub struct MiningPipeline;

impl MiningPipeline {
    /// Mine every selected bug of every configured project.
    ///
    /// For each bug: fetch metadata, check out the buggy version, run the
    /// triggering tests, export the patch and synthesize a session. A bug
    /// whose steps fail is recorded in [`PipelineReport::failures`] and the
    /// run moves on; a project whose bug list cannot be read is skipped.
    pub async fn run(
        db: &dyn BugDatabase,
        config: &PipelineConfig,
    ) -> anyhow::Result<PipelineReport> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, projects = config.projects.len(), "starting mining run");

        tokio::fs::create_dir_all(&config.work_dir)
            .await
            .with_context(|| format!("failed to create work dir {}", config.work_dir.display()))?;

        let mut sessions = Vec::new();
        let mut failures = Vec::new();

        for project in &config.projects {
            let bug_ids = match Self::select_bug_ids(db, project, config).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(project = %project, error = %format!("{e:#}"), "skipping project");
                    continue;
                }
            };
            info!(project = %project, bugs = bug_ids.len(), "mining project");

            for bug_id in bug_ids {
                emit_bug_started(project, &bug_id);
                let result = Self::process_bug(db, project, &bug_id, config)
                    .instrument(bug_span(project, &bug_id))
                    .await;

                match result {
                    Ok(session) => {
                        emit_bug_finished(
                            project,
                            &bug_id,
                            session.test_outcomes.len(),
                            session.log_sequence.len(),
                        );
                        sessions.push(session);
                    }
                    Err(e) => {
                        emit_bug_failed(project, &bug_id, &e);
                        failures.push(BugFailure {
                            project: project.clone(),
                            bug_id,
                            error: format!("{e:#}"),
                        });
                    }
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            sessions = sessions.len(),
            failures = failures.len(),
            duration_ms,
            "mining run finished"
        );

        Ok(PipelineReport {
            run_id,
            sessions,
            failures,
            duration_ms,
        })
    }

    async fn select_bug_ids(
        db: &dyn BugDatabase,
        project: &str,
        config: &PipelineConfig,
    ) -> anyhow::Result<Vec<String>> {
        let mut ids = match &config.bug_ids {
            Some(ids) => ids.clone(),
            None => db
                .list_bug_ids(project)
                .await
                .with_context(|| format!("failed to list bugs of {project}"))?,
        };
        if let Some(limit) = config.limit {
            ids.truncate(limit);
        }
        Ok(ids)
    }

    async fn process_bug(
        db: &dyn BugDatabase,
        project: &str,
        bug_id: &str,
        config: &PipelineConfig,
    ) -> anyhow::Result<DebugSession> {
        let mut bug = db
            .bug_info(project, bug_id)
            .await
            .context("failed to read bug metadata")?;

        let checkout = db
            .checkout(project, bug_id, &config.work_dir, CheckoutVersion::Buggy)
            .await
            .context("failed to check out buggy version")?;

        let outcomes = db
            .run_tests(&checkout, &bug.triggering_tests)
            .await
            .context("failed to run triggering tests")?;

        bug.patch = db
            .export_patch(project, bug_id, &checkout)
            .await
            .context("failed to export patch")?;
        bug.checkout_path = Some(checkout);

        if let Some(log) = &config.report_log {
            append_bug_report(log, &bug)
                .with_context(|| format!("failed to append to {}", log.display()))?;
        }

        Ok(synthesize_session(&bug, &outcomes, config.started_at))
    }
}
