//! End-to-end properties of synthesized debugging sessions.

use bugsynth_core::{synthesize_session, BugRecord, LogLevel, TestOutcome, TestStatus};
use chrono::{DateTime, TimeZone, Utc};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
}

fn bug(classes: &[&str], patch: &str) -> BugRecord {
    let mut bug = BugRecord::new("Lang", "1");
    bug.triggering_tests = vec!["org.apache.commons.lang3.math.NumberUtilsTest::TestLang747".into()];
    bug.bug_report_url = "https://issues.apache.org/jira/browse/LANG-747".into();
    bug.modified_classes = classes.iter().map(|c| c.to_string()).collect();
    bug.patch = patch.into();
    bug
}

fn messages(session: &bugsynth_core::DebugSession) -> Vec<&str> {
    session
        .log_sequence
        .iter()
        .map(|l| l.message.as_str())
        .collect()
}

#[test]
fn zero_failures_keeps_fixed_phases() {
    let session = synthesize_session(&bug(&["a.A"], ""), &[], start());

    // setup 2 + failure 0 + investigation 1+1 + discovery 2 + resolution 3
    assert_eq!(session.log_sequence.len(), 9);
    assert_eq!(session.timeline.len(), 9);
    assert!(session
        .log_sequence
        .iter()
        .all(|l| l.level != LogLevel::Error));
    assert_eq!(
        session.timeline,
        vec![
            "Started investigating Lang bug #1",
            "Executed test suite to reproduce issue",
            "Began examining modified classes",
            "Analyzed a.A",
            "Discovered root cause: Logic error in implementation",
            "Reviewed patch to understand fix",
            "Applied patch from fixed version",
            "Verified fix by re-running tests",
            "Confirmed all tests now pass",
        ]
    );
}

#[test]
fn investigation_narrates_at_most_three_classes() {
    let classes = ["a.A", "a.B", "a.C", "a.D", "a.E"];
    let session = synthesize_session(&bug(&classes, ""), &[], start());

    let investigation: Vec<_> = session
        .log_sequence
        .iter()
        .filter(|l| l.source == "debugger" && l.level == LogLevel::Debug)
        .filter(|l| l.message != "Analyzing patch differences")
        .collect();
    assert_eq!(investigation.len(), 4);
    assert_eq!(investigation[0].message, "Starting code investigation");
    let listed = investigation[0].metadata.as_ref().unwrap()["modified_classes"]
        .as_array()
        .unwrap()
        .len();
    assert_eq!(listed, 5);
    assert_eq!(investigation[3].message, "Examining class: a.C");
    assert_eq!(investigation[3].timestamp, "2024-01-15T10:31:30Z");
}

#[test]
fn failing_outcomes_are_narrated_in_order() {
    let outcomes = vec![
        TestOutcome::failed("t.A::one", start())
            .with_error_message("java.lang.NullPointerException")
            .with_stack_trace("java.lang.NullPointerException\n\tat t.A.one(A.java:1)"),
        TestOutcome::passed("t.A::two", start()),
        TestOutcome::failed("t.A::three", start()),
    ];
    let session = synthesize_session(&bug(&["a.A"], "if (x != null)"), &outcomes, start());
    let msgs = messages(&session);

    assert_eq!(
        &msgs[..5],
        &[
            "Building Lang project (bug 1)",
            "Running test suite (3 tests)",
            "Test failed: t.A::one",
            "Stack trace for t.A::one",
            "Test failed: t.A::three",
        ]
    );
    assert!(msgs.contains(&"Root cause identified: Null pointer handling issue"));
    assert!(session
        .timeline
        .contains(&"Identified failing test: t.A::three".to_string()));
    assert!(!session
        .timeline
        .contains(&"Identified failing test: t.A::two".to_string()));
}

#[test]
fn timestamps_follow_fixed_offsets() {
    let outcomes = vec![TestOutcome::failed("t.A::one", start())];
    let session = synthesize_session(&bug(&["a.A", "a.B"], ""), &outcomes, start());
    let stamps: Vec<&str> = session
        .log_sequence
        .iter()
        .map(|l| l.timestamp.as_str())
        .collect();
    assert_eq!(
        stamps,
        vec![
            "2024-01-15T10:30:00Z",
            "2024-01-15T10:30:05Z",
            "2024-01-15T10:30:12Z",
            "2024-01-15T10:31:00Z",
            "2024-01-15T10:31:10Z",
            "2024-01-15T10:31:20Z",
            "2024-01-15T10:32:00Z",
            "2024-01-15T10:32:05Z",
            "2024-01-15T10:33:00Z",
            "2024-01-15T10:33:10Z",
            "2024-01-15T10:33:15Z",
        ]
    );
}

#[test]
fn same_inputs_produce_identical_sessions() {
    let outcomes = vec![TestOutcome::failed("t.A::one", start()).with_error_message("boom")];
    let b = bug(&["a.A"], "index");
    let first = synthesize_session(&b, &outcomes, start());
    let second = synthesize_session(&b, &outcomes, start());
    assert_eq!(first, second);
}

/// The Resolution phase is a fixed success narrative: it reports passing tests
/// even when every gathered outcome failed.
#[test]
fn resolution_always_narrates_success() {
    let outcomes = vec![
        TestOutcome::failed("t.A::one", start()),
        TestOutcome::failed("t.A::two", start()),
    ];
    let session = synthesize_session(&bug(&["a.A"], ""), &outcomes, start());
    let last = session.log_sequence.last().unwrap();
    assert_eq!(last.message, "All tests passing after fix");
    assert_eq!(last.metadata.as_ref().unwrap()["status"], "SUCCESS");
    assert!(session
        .test_outcomes
        .iter()
        .all(|t| t.status == TestStatus::Fail));
}

#[test]
fn summary_names_first_two_classes_and_first_error() {
    let outcomes = vec![
        TestOutcome::failed("t.A::one", start()),
        TestOutcome::failed("t.A::two", start()).with_error_message("expected:<1> but was:<2>"),
    ];
    let session = synthesize_session(&bug(&["a.A", "a.B", "a.C"], ""), &outcomes, start());
    assert_eq!(
        session.root_cause_summary,
        "Bug in Lang (#1): 2 test(s) failed. Root cause located in a.A, a.B. \
         Error: expected:<1> but was:<2>..."
    );
}
