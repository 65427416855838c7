//! Synthetic debugging-session generation.
//!
//! A session is a pure function of the bug record, its gathered test outcomes
//! and a start instant. Five phases run in a fixed order, each scheduled at a
//! fixed offset from the start instant:
//!
//! | Phase         | Offsets                                        |
//! |---------------|------------------------------------------------|
//! | Setup         | +0s, +5s                                       |
//! | Failure       | from +10s, +2s per failing test, +1s per trace |
//! | Investigation | +60s, then +10s per class (first three)        |
//! | Discovery     | +120s, +125s                                   |
//! | Resolution    | +180s, +190s, +195s                            |
//!
//! The Resolution phase always narrates a verified fix; it does not look at
//! the actual outcomes.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::model::{BugRecord, DebugSession, LogEntry, LogLevel, TestOutcome};

/// Maximum characters of a stack trace carried in a log entry.
pub const STACK_TRACE_EXCERPT_CHARS: usize = 500;

/// Maximum characters of an error message quoted in the root-cause summary.
pub const ERROR_EXCERPT_CHARS: usize = 100;

/// Number of modified classes narrated individually.
pub const NARRATED_CLASS_LIMIT: usize = 3;

/// Number of modified classes named in the root-cause summary.
const SUMMARY_CLASS_LIMIT: usize = 2;

/// Coarse root-cause category inferred from a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootCauseCategory {
    NullHandling,
    BoundsOrIndexing,
    AssertionOrValidation,
    ComparisonOrEquality,
    Logic,
}

impl RootCauseCategory {
    /// Classify a patch by ordered keyword matching.
    ///
    /// `null` wins over `bound`/`index`, which win over `assert`, which wins
    /// over `==`/`!=`. Keyword matching ignores case; an empty patch is a
    /// logic error.
    pub fn infer(patch: &str) -> Self {
        if patch.is_empty() {
            return RootCauseCategory::Logic;
        }
        let lower = patch.to_lowercase();
        if lower.contains("null") {
            RootCauseCategory::NullHandling
        } else if lower.contains("bound") || lower.contains("index") {
            RootCauseCategory::BoundsOrIndexing
        } else if lower.contains("assert") {
            RootCauseCategory::AssertionOrValidation
        } else if patch.contains("==") || patch.contains("!=") {
            RootCauseCategory::ComparisonOrEquality
        } else {
            RootCauseCategory::Logic
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RootCauseCategory::NullHandling => "Null pointer handling issue",
            RootCauseCategory::BoundsOrIndexing => "Array bounds or indexing error",
            RootCauseCategory::AssertionOrValidation => "Assertion or validation error",
            RootCauseCategory::ComparisonOrEquality => "Comparison or equality check error",
            RootCauseCategory::Logic => "Logic error in implementation",
        }
    }
}

impl fmt::Display for RootCauseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Log entries and timeline steps contributed by one phase.
#[derive(Debug, Default)]
struct Phase {
    logs: Vec<LogEntry>,
    steps: Vec<String>,
}

impl Phase {
    fn log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    fn step(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }
}

/// Build the debugging session for `bug` starting at `started_at`.
pub fn synthesize_session(
    bug: &BugRecord,
    test_outcomes: &[TestOutcome],
    started_at: DateTime<Utc>,
) -> DebugSession {
    let phases = [
        setup_phase(bug, test_outcomes, started_at),
        failure_phase(test_outcomes, started_at),
        investigation_phase(bug, started_at),
        discovery_phase(bug, started_at),
        resolution_phase(bug, started_at),
    ];

    let mut log_sequence = Vec::new();
    let mut timeline = Vec::new();
    for phase in phases {
        log_sequence.extend(phase.logs);
        timeline.extend(phase.steps);
    }

    DebugSession {
        bug: bug.clone(),
        test_outcomes: test_outcomes.to_vec(),
        log_sequence,
        timeline,
        root_cause_summary: root_cause_summary(bug, test_outcomes),
    }
}

fn setup_phase(bug: &BugRecord, test_outcomes: &[TestOutcome], t0: DateTime<Utc>) -> Phase {
    let mut phase = Phase::default();

    phase.log(
        LogEntry::new(
            t0,
            LogLevel::Info,
            "build",
            format!("Building {} project (bug {})", bug.project, bug.bug_id),
        )
        .with_metadata(json!({ "project": bug.project, "bug_id": bug.bug_id })),
    );
    phase.step(format!(
        "Started investigating {} bug #{}",
        bug.project, bug.bug_id
    ));

    phase.log(
        LogEntry::new(
            t0 + Duration::seconds(5),
            LogLevel::Info,
            "test_runner",
            format!("Running test suite ({} tests)", test_outcomes.len()),
        )
        .with_metadata(json!({ "test_count": test_outcomes.len() })),
    );
    phase.step("Executed test suite to reproduce issue");

    phase
}

fn failure_phase(test_outcomes: &[TestOutcome], t0: DateTime<Utc>) -> Phase {
    let mut phase = Phase::default();
    let mut t = t0 + Duration::seconds(10);

    for outcome in test_outcomes.iter().filter(|o| o.is_failure()) {
        t += Duration::seconds(2);
        phase.log(
            LogEntry::new(
                t,
                LogLevel::Error,
                "test",
                format!("Test failed: {}", outcome.test_name),
            )
            .with_metadata(json!({
                "test_name": outcome.test_name,
                "error": outcome.error_message,
                "execution_time": outcome.execution_time,
            })),
        );

        if let Some(trace) = outcome.stack_trace.as_deref().filter(|s| !s.is_empty()) {
            t += Duration::seconds(1);
            phase.log(
                LogEntry::new(
                    t,
                    LogLevel::Error,
                    "test",
                    format!("Stack trace for {}", outcome.test_name),
                )
                .with_metadata(json!({
                    "stack_trace": truncate_chars(trace, STACK_TRACE_EXCERPT_CHARS),
                })),
            );
        }

        phase.step(format!("Identified failing test: {}", outcome.test_name));
    }

    phase
}

fn investigation_phase(bug: &BugRecord, t0: DateTime<Utc>) -> Phase {
    let mut phase = Phase::default();
    let mut t = t0 + Duration::seconds(60);

    phase.log(
        LogEntry::new(t, LogLevel::Debug, "debugger", "Starting code investigation")
            .with_metadata(json!({ "modified_classes": bug.modified_classes })),
    );
    phase.step("Began examining modified classes");

    for class_name in bug.modified_classes.iter().take(NARRATED_CLASS_LIMIT) {
        t += Duration::seconds(10);
        phase.log(
            LogEntry::new(
                t,
                LogLevel::Debug,
                "debugger",
                format!("Examining class: {class_name}"),
            )
            .with_metadata(json!({ "class": class_name })),
        );
        phase.step(format!("Analyzed {class_name}"));
    }

    phase
}

fn discovery_phase(bug: &BugRecord, t0: DateTime<Utc>) -> Phase {
    let mut phase = Phase::default();
    let category = RootCauseCategory::infer(&bug.patch);

    phase.log(
        LogEntry::new(
            t0 + Duration::seconds(120),
            LogLevel::Info,
            "debugger",
            format!("Root cause identified: {category}"),
        )
        .with_metadata(json!({ "bug_url": bug.bug_report_url })),
    );
    phase.step(format!("Discovered root cause: {category}"));

    phase.log(
        LogEntry::new(
            t0 + Duration::seconds(125),
            LogLevel::Debug,
            "debugger",
            "Analyzing patch differences",
        )
        .with_metadata(json!({ "modified_files": bug.modified_classes.len() })),
    );
    phase.step("Reviewed patch to understand fix");

    phase
}

fn resolution_phase(bug: &BugRecord, t0: DateTime<Utc>) -> Phase {
    let mut phase = Phase::default();

    phase.log(
        LogEntry::new(
            t0 + Duration::seconds(180),
            LogLevel::Info,
            "vcs",
            "Applying patch to fix bug",
        )
        .with_metadata(json!({ "bug_id": bug.bug_id })),
    );
    phase.step("Applied patch from fixed version");

    phase.log(
        LogEntry::new(
            t0 + Duration::seconds(190),
            LogLevel::Info,
            "test_runner",
            "Re-running tests after fix",
        )
        .with_metadata(json!({ "expected_result": "PASS" })),
    );
    phase.step("Verified fix by re-running tests");

    phase.log(
        LogEntry::new(
            t0 + Duration::seconds(195),
            LogLevel::Info,
            "test",
            "All tests passing after fix",
        )
        .with_metadata(json!({ "status": "SUCCESS" })),
    );
    phase.step("Confirmed all tests now pass");

    phase
}

/// One-paragraph summary of the bug and its failing evidence.
pub fn root_cause_summary(bug: &BugRecord, test_outcomes: &[TestOutcome]) -> String {
    let failing = test_outcomes.iter().filter(|o| o.is_failure());
    let failed_count = failing.clone().count();
    let classes = bug
        .modified_classes
        .iter()
        .take(SUMMARY_CLASS_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut summary = format!(
        "Bug in {} (#{}): {} test(s) failed. Root cause located in {}. ",
        bug.project, bug.bug_id, failed_count, classes
    );

    let first_error = failing
        .filter_map(|o| o.error_message.as_deref())
        .find(|m| !m.is_empty());
    if let Some(message) = first_error {
        summary.push_str(&format!(
            "Error: {}...",
            truncate_chars(message, ERROR_EXCERPT_CHARS)
        ));
    }

    summary
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_infer_null() {
        assert_eq!(
            RootCauseCategory::infer("fix: check for null before use").description(),
            "Null pointer handling issue"
        );
        assert_eq!(
            RootCauseCategory::infer("if (x == NULL)"),
            RootCauseCategory::NullHandling
        );
    }

    #[test]
    fn test_infer_empty_is_logic() {
        assert_eq!(
            RootCauseCategory::infer("").description(),
            "Logic error in implementation"
        );
    }

    #[test]
    fn test_infer_bounds() {
        assert_eq!(
            RootCauseCategory::infer("array index out of bound").description(),
            "Array bounds or indexing error"
        );
        assert_eq!(
            RootCauseCategory::infer("upper BOUND check"),
            RootCauseCategory::BoundsOrIndexing
        );
    }

    #[test]
    fn test_infer_null_takes_precedence_over_bound() {
        assert_eq!(
            RootCauseCategory::infer("null bound"),
            RootCauseCategory::NullHandling
        );
    }

    #[test]
    fn test_infer_assert_and_comparison() {
        assert_eq!(
            RootCauseCategory::infer("Validate.isTrue -> assertState"),
            RootCauseCategory::AssertionOrValidation
        );
        assert_eq!(
            RootCauseCategory::infer("- if (a == b)\n+ if (a.equals(b))"),
            RootCauseCategory::ComparisonOrEquality
        );
        assert_eq!(
            RootCauseCategory::infer("x != y"),
            RootCauseCategory::ComparisonOrEquality
        );
        assert_eq!(
            RootCauseCategory::infer("- return a + b;\n+ return a - b;"),
            RootCauseCategory::Logic
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_failure_phase_schedule() {
        let outcomes = vec![
            TestOutcome::failed("a.B::one", t0()).with_stack_trace("trace"),
            TestOutcome::passed("a.B::two", t0()),
            TestOutcome::failed("a.B::three", t0()),
        ];
        let phase = failure_phase(&outcomes, t0());
        let stamps: Vec<&str> = phase.logs.iter().map(|l| l.timestamp.as_str()).collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-15T10:30:12Z",
                "2024-01-15T10:30:13Z",
                "2024-01-15T10:30:15Z",
            ]
        );
        assert_eq!(phase.steps.len(), 2);
    }

    #[test]
    fn test_failure_phase_ignores_error_status() {
        let mut errored = TestOutcome::failed("a.B::c", t0());
        errored.status = crate::model::TestStatus::Error;
        let phase = failure_phase(&[errored], t0());
        assert!(phase.logs.is_empty());
        assert!(phase.steps.is_empty());
    }

    #[test]
    fn test_stack_trace_excerpt_is_capped() {
        let long = "x".repeat(2_000);
        let outcomes = vec![TestOutcome::failed("a.B::c", t0()).with_stack_trace(long)];
        let phase = failure_phase(&outcomes, t0());
        let meta = phase.logs[1].metadata.as_ref().unwrap();
        assert_eq!(meta["stack_trace"].as_str().unwrap().len(), STACK_TRACE_EXCERPT_CHARS);
    }

    #[test]
    fn test_root_cause_summary_without_error() {
        let mut bug = BugRecord::new("Lang", "1");
        bug.modified_classes = vec!["a.A".into(), "a.B".into(), "a.C".into()];
        let outcomes = vec![TestOutcome::failed("t::1", t0())];
        assert_eq!(
            root_cause_summary(&bug, &outcomes),
            "Bug in Lang (#1): 1 test(s) failed. Root cause located in a.A, a.B. "
        );
    }

    #[test]
    fn test_root_cause_summary_with_error_excerpt() {
        let mut bug = BugRecord::new("Math", "5");
        bug.modified_classes = vec!["m.Complex".into()];
        let message = "e".repeat(150);
        let outcomes = vec![
            TestOutcome::passed("t::0", t0()).with_error_message("ignored"),
            TestOutcome::failed("t::1", t0()).with_error_message(message),
        ];
        let summary = root_cause_summary(&bug, &outcomes);
        let expected_tail = format!("Error: {}...", "e".repeat(100));
        assert!(summary.starts_with(
            "Bug in Math (#5): 1 test(s) failed. Root cause located in m.Complex. "
        ));
        assert!(summary.ends_with(&expected_tail));
    }
}
