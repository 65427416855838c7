//! Bug-database trait and the Defects4J CLI backend.
//!
//! Every Defects4J interaction goes through a subprocess; the text it prints
//! is handed to the parsers in `bugsynth_core::parser`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bugsynth_core::model::{BugRecord, TestOutcome};
use bugsynth_core::parser::{
    enrich_with_failure_details, parse_bug_metadata, parse_multi_test_results,
    parse_single_test_result,
};

use crate::config::ToolConfig;
use crate::error::Result;
use crate::runner::{ToolOutput, ToolRunner};

/// Projects assumed when the tool cannot list its own.
pub const FALLBACK_PROJECTS: [&str; 6] = ["Chart", "Closure", "Lang", "Math", "Mockito", "Time"];

/// Report written by `defects4j test` into the checkout directory.
pub const FAILING_TESTS_FILE: &str = "failing_tests";

/// Which side of a bug to check out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutVersion {
    Buggy,
    Fixed,
}

impl CheckoutVersion {
    /// Version suffix used by Defects4J (`1b`, `1f`).
    pub fn suffix(&self) -> &'static str {
        match self {
            CheckoutVersion::Buggy => "b",
            CheckoutVersion::Fixed => "f",
        }
    }
}

/// Access to a database of reproducible bugs.
#[async_trait]
pub trait BugDatabase: Send + Sync {
    /// Project identifiers. Never fails; falls back to a fixed list.
    async fn list_projects(&self) -> Vec<String>;

    /// Bug identifiers of a project, in tool order.
    async fn list_bug_ids(&self, project: &str) -> Result<Vec<String>>;

    /// Metadata of one bug. `patch` and `checkout_path` are left empty.
    async fn bug_info(&self, project: &str, bug_id: &str) -> Result<BugRecord>;

    /// Check out one side of a bug below `work_dir`; returns the checkout path.
    async fn checkout(
        &self,
        project: &str,
        bug_id: &str,
        work_dir: &Path,
        version: CheckoutVersion,
    ) -> Result<PathBuf>;

    /// Run `tests` (or the whole suite when empty) inside a checkout.
    async fn run_tests(&self, checkout: &Path, tests: &[String]) -> Result<Vec<TestOutcome>>;

    /// Diff from the buggy to the fixed version.
    async fn export_patch(&self, project: &str, bug_id: &str, checkout: &Path) -> Result<String>;
}

/// [`BugDatabase`] backed by the `defects4j` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct Defects4j {
    config: ToolConfig,
}

impl Defects4j {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    async fn invoke(&self, args: &[&str], cwd: Option<&Path>) -> Result<ToolOutput> {
        ToolRunner::run(&self.config.program(), args, cwd, self.config.timeout_secs).await
    }

    async fn run_single_test(&self, checkout: &Path, test_name: &str) -> Result<TestOutcome> {
        let output = self.invoke(&["test", "-t", test_name], Some(checkout)).await?;
        let mut outcome = parse_single_test_result(test_name, &output.stdout)
            .with_execution_time(output.duration_secs());

        if let Some(report) = read_failure_report(checkout).await {
            enrich_with_failure_details(std::slice::from_mut(&mut outcome), &report);
        }
        debug!(test = %test_name, status = %outcome.status, "ran single test");
        Ok(outcome)
    }
}

/// Non-blank, trimmed lines of a listing command.
fn listed_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Content of the checkout's failure report, if one was written.
///
/// The JVM writes it in the platform encoding, so invalid UTF-8 is replaced
/// rather than rejected.
async fn read_failure_report(checkout: &Path) -> Option<String> {
    let path = checkout.join(FAILING_TESTS_FILE);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read failure report");
            None
        }
    }
}

/// Git tag Defects4J places on each side of a bug inside a checkout.
pub fn version_tag(project: &str, bug_id: &str, version: CheckoutVersion) -> String {
    let side = match version {
        CheckoutVersion::Buggy => "BUGGY",
        CheckoutVersion::Fixed => "FIXED",
    };
    format!("D4J_{project}_{bug_id}_{side}_VERSION")
}

#[async_trait]
impl BugDatabase for Defects4j {
    async fn list_projects(&self) -> Vec<String> {
        let listed = self
            .invoke(&["pids"], None)
            .await
            .and_then(ToolOutput::require_success)
            .map(|out| listed_lines(&out.stdout));

        match listed {
            Ok(projects) if !projects.is_empty() => {
                debug!(count = projects.len(), "listed projects");
                projects
            }
            Ok(_) => {
                warn!("tool listed no projects; falling back to default project list");
                FALLBACK_PROJECTS.iter().map(|p| p.to_string()).collect()
            }
            Err(e) => {
                warn!(error = %e, "could not list projects; falling back to default project list");
                FALLBACK_PROJECTS.iter().map(|p| p.to_string()).collect()
            }
        }
    }

    async fn list_bug_ids(&self, project: &str) -> Result<Vec<String>> {
        let output = self
            .invoke(&["bids", "-p", project], None)
            .await?
            .require_success()?;
        Ok(listed_lines(&output.stdout))
    }

    async fn bug_info(&self, project: &str, bug_id: &str) -> Result<BugRecord> {
        let output = self
            .invoke(&["info", "-p", project, "-b", bug_id], None)
            .await?
            .require_success()?;
        Ok(parse_bug_metadata(&output.stdout).into_record(project, bug_id))
    }

    async fn checkout(
        &self,
        project: &str,
        bug_id: &str,
        work_dir: &Path,
        version: CheckoutVersion,
    ) -> Result<PathBuf> {
        let path = work_dir.join(format!("{project}_{bug_id}_{}", version.suffix()));
        tokio::fs::create_dir_all(&path).await?;

        let revision = format!("{bug_id}{}", version.suffix());
        let target = path.to_string_lossy().into_owned();
        self.invoke(
            &[
                "checkout",
                "-p",
                project,
                "-v",
                revision.as_str(),
                "-w",
                target.as_str(),
            ],
            None,
        )
        .await?
        .require_success()?;

        debug!(path = %path.display(), "checked out bug");
        Ok(path)
    }

    async fn run_tests(&self, checkout: &Path, tests: &[String]) -> Result<Vec<TestOutcome>> {
        if tests.is_empty() {
            let output = self.invoke(&["test"], Some(checkout)).await?;
            let mut outcomes = parse_multi_test_results(&output.stdout);
            if let Some(report) = read_failure_report(checkout).await {
                enrich_with_failure_details(&mut outcomes, &report);
            }
            return Ok(outcomes);
        }

        let mut outcomes = Vec::with_capacity(tests.len());
        for test in tests {
            outcomes.push(self.run_single_test(checkout, test).await?);
        }
        Ok(outcomes)
    }

    async fn export_patch(&self, project: &str, bug_id: &str, checkout: &Path) -> Result<String> {
        let buggy = version_tag(project, bug_id, CheckoutVersion::Buggy);
        let fixed = version_tag(project, bug_id, CheckoutVersion::Fixed);
        let output = ToolRunner::run(
            Path::new("git"),
            &["diff", buggy.as_str(), fixed.as_str()],
            Some(checkout),
            self.config.timeout_secs,
        )
        .await?;

        if output.passed() {
            Ok(output.stdout)
        } else {
            warn!(
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "could not diff version tags; using empty patch"
            );
            Ok(String::new())
        }
    }
}
