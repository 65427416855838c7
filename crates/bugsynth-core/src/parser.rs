//! Parsers for Defects4J command output.
//!
//! The tool prints loosely structured, human-readable text. Every parser here
//! is best-effort: a section that is missing or drifted out of shape yields an
//! empty value, never an error.
//!
//! `defects4j info` output looks like:
//!
//! ```text
//! Root cause in triggering tests:
//!  - org.apache.commons.lang3.math.NumberUtilsTest::TestLang747
//!    --> java.lang.NumberFormatException: For input string: "80000000"
//! --------------------------------------------------------------------------------
//! Bug report url:
//! https://issues.apache.org/jira/browse/LANG-747
//! --------------------------------------------------------------------------------
//! List of modified sources:
//!  - org.apache.commons.lang3.math.NumberUtils
//! ```
//!
//! The `failing_tests` report groups failures under `--- <test>` headers.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{BugRecord, TestOutcome};

// Regex patterns (compiled once via LazyLock)

static TRIGGERING_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Root cause in triggering tests:[ \t]*\r?\n((?:[ \t][^\n]*\n?)+)").unwrap()
});

static MODIFIED_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"List of modified sources:[ \t]*\r?\n((?:[ \t][^\n]*\n?)+)").unwrap()
});

static BUG_REPORT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Bug report url:[ \t]*(?:\r?\n)?[ \t]*(\S[^\r\n]*)").unwrap()
});

static TEST_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*-[ \t]+(.+)$").unwrap());

static SOURCE_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*-[ \t]*(.+)$").unwrap());

static FAILING_TEST_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^  - ([a-zA-Z0-9_.$:]+)\r?$").unwrap());

static REPORT_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^---\s").unwrap());

/// Marker printed by `defects4j test` when nothing failed.
pub const NO_FAILURES_MARKER: &str = "Failing tests: 0";

/// Horizontal rule between `defects4j info` sections.
const SECTION_RULE: &str = "---";

/// Exception detail lines under a triggering test start with this marker.
const CONTINUATION_MARKER: &str = "->";

/// Fields recovered from `defects4j info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BugMetadata {
    pub triggering_tests: Vec<String>,
    pub bug_report_url: String,
    pub modified_classes: Vec<String>,
}

impl BugMetadata {
    /// Attach the bug identity. `patch` and `checkout_path` stay empty.
    pub fn into_record(self, project: &str, bug_id: &str) -> BugRecord {
        BugRecord {
            triggering_tests: self.triggering_tests,
            bug_report_url: self.bug_report_url,
            modified_classes: self.modified_classes,
            ..BugRecord::new(project, bug_id)
        }
    }
}

/// Parse the text printed by `defects4j info -p <project> -b <bug>`.
pub fn parse_bug_metadata(text: &str) -> BugMetadata {
    let triggering_tests = TRIGGERING_BLOCK_RE
        .captures(text)
        .map(|caps| bulleted_items(&caps[1], &TEST_BULLET_RE))
        .unwrap_or_default();

    let bug_report_url = BUG_REPORT_URL_RE
        .captures(text)
        .map(|caps| caps[1].trim_end().to_string())
        .filter(|url| !url.starts_with(SECTION_RULE))
        .unwrap_or_default();

    let modified_classes = MODIFIED_BLOCK_RE
        .captures(text)
        .map(|caps| bulleted_items(&caps[1], &SOURCE_BULLET_RE))
        .unwrap_or_default();

    debug!(
        tests = triggering_tests.len(),
        sources = modified_classes.len(),
        has_url = !bug_report_url.is_empty(),
        "parsed bug metadata"
    );

    BugMetadata {
        triggering_tests,
        bug_report_url,
        modified_classes,
    }
}

fn bulleted_items(block: &str, bullet: &Regex) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| bullet.captures(line.trim_end()))
        .map(|caps| caps[1].trim().to_string())
        .filter(|item| !item.is_empty() && !item.starts_with(CONTINUATION_MARKER))
        .collect()
}

/// Parse the stdout of a whole-suite `defects4j test` run.
///
/// Only failing tests are listed by the tool, each as `  - <name>`; every
/// match becomes a FAIL outcome without detail.
pub fn parse_multi_test_results(stdout: &str) -> Vec<TestOutcome> {
    let now = Utc::now();
    let outcomes: Vec<TestOutcome> = FAILING_TEST_LINE_RE
        .captures_iter(stdout)
        .map(|caps| TestOutcome::failed(&caps[1], now))
        .collect();
    debug!(failing = outcomes.len(), "parsed test run output");
    outcomes
}

/// Parse the stdout of `defects4j test -t <name>`.
pub fn parse_single_test_result(test_name: &str, stdout: &str) -> TestOutcome {
    let now = Utc::now();
    if stdout.contains(NO_FAILURES_MARKER) {
        TestOutcome::passed(test_name, now)
    } else {
        TestOutcome::failed(test_name, now)
    }
}

/// Rewrites a test identifier into one of the spellings the tool uses.
pub type NameVariant = fn(&str) -> Cow<'_, str>;

fn as_given(name: &str) -> Cow<'_, str> {
    Cow::Borrowed(name)
}

fn dotted_method(name: &str) -> Cow<'_, str> {
    if name.contains("::") {
        Cow::Owned(name.replace("::", "."))
    } else {
        Cow::Borrowed(name)
    }
}

fn class_only(name: &str) -> Cow<'_, str> {
    match name.split_once("::") {
        Some((class, _)) => Cow::Borrowed(class),
        None => Cow::Borrowed(name),
    }
}

/// Spellings tried, in order, when looking a test up in the failure report:
/// `a.B::m`, then `a.B.m`, then `a.B`.
pub const TEST_NAME_VARIANTS: [NameVariant; 3] = [as_given, dotted_method, class_only];

/// Apply each variant to `name` in order and return the first hit of `lookup`.
pub fn first_variant_match<T>(
    name: &str,
    variants: &[NameVariant],
    mut lookup: impl FnMut(&str) -> Option<T>,
) -> Option<T> {
    variants.iter().find_map(|variant| lookup(&variant(name)))
}

/// Extract the failure block recorded for `test_name` in a `failing_tests`
/// report.
///
/// The block runs from the matching `--- <name>` header to the next header
/// or the end of the text, with surrounding blank lines removed. Text after
/// the name on the header line is kept as the block's first line.
pub fn extract_detailed_failure(report_text: &str, test_name: &str) -> Option<String> {
    first_variant_match(test_name, &TEST_NAME_VARIANTS, |variant| {
        failure_block(report_text, variant)
    })
}

fn failure_block(report_text: &str, name: &str) -> Option<String> {
    let header = Regex::new(&format!(
        r"(?m)^---[ \t]*{}(?:[ \t]+([^\r\n]*))?\r?$",
        regex::escape(name)
    ))
    .ok()?;
    let caps = header.captures(report_text)?;
    let start = caps.get(0)?.end();

    let rest = &report_text[start..];
    let end = REPORT_HEADER_RE
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    let body = rest[..end].trim_start_matches(['\r', '\n']).trim_end();

    let block = match caps.get(1).map(|m| m.as_str().trim_end()) {
        Some(extra) if !extra.is_empty() => format!("{extra}\n{body}"),
        _ => body.to_string(),
    };

    if block.trim().is_empty() {
        None
    } else {
        Some(block)
    }
}

/// Back-fill FAIL outcomes from a `failing_tests` report.
///
/// Outcomes that already carry an error message are left alone. For the rest,
/// the report block becomes the stack trace and its first non-blank line the
/// error message. Returns how many outcomes were enriched.
pub fn enrich_with_failure_details(outcomes: &mut [TestOutcome], report_text: &str) -> usize {
    let mut enriched = 0;
    for outcome in outcomes.iter_mut() {
        if !outcome.is_failure() || outcome.error_message.is_some() {
            continue;
        }
        let Some(block) = extract_detailed_failure(report_text, &outcome.test_name) else {
            continue;
        };
        outcome.error_message = block
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string);
        if outcome.stack_trace.is_none() {
            outcome.stack_trace = Some(block);
        }
        enriched += 1;
    }
    debug!(enriched, "back-filled failure details");
    enriched
}
