//! Bug-record model.
//!
//! Plain records shared by the parser, the session synthesizer and the
//! exporter:
//! - [`BugRecord`]: metadata of one database bug
//! - [`TestOutcome`]: result of one executed test
//! - [`LogEntry`]: one synthesized log line
//! - [`DebugSession`]: the aggregate exported per bug

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata for a single bug in the external bug database.
///
/// `triggering_tests` and `modified_classes` keep the order in which the tool
/// printed them. `patch` and `checkout_path` are filled in by later pipeline
/// stages, never by the parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BugRecord {
    /// Project identifier (e.g. "Lang", "Math").
    pub project: String,

    /// Bug identifier within the project (e.g. "1").
    pub bug_id: String,

    /// Tests that fail on the buggy version and pass on the fixed one.
    pub triggering_tests: Vec<String>,

    /// Link to the upstream issue report, empty when unknown.
    pub bug_report_url: String,

    /// Diff from the buggy to the fixed version.
    pub patch: String,

    /// Classes or source paths touched by the fix.
    pub modified_classes: Vec<String>,

    /// Where the buggy version was checked out.
    pub checkout_path: Option<PathBuf>,
}

impl BugRecord {
    /// Create a record with no metadata beyond its identity.
    pub fn new(project: impl Into<String>, bug_id: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            bug_id: bug_id.into(),
            triggering_tests: Vec::new(),
            bug_report_url: String::new(),
            patch: String::new(),
            modified_classes: Vec::new(),
            checkout_path: None,
        }
    }

    /// `Project_BugId`, the key used in exported datasets.
    pub fn dataset_key(&self) -> String {
        format!("{}_{}", self.project, self.bug_id)
    }

    /// `Project-BugId`, the label used in logs and the plain-text report.
    pub fn label(&self) -> String {
        format!("{}-{}", self.project, self.bug_id)
    }
}

/// Outcome status of an executed test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one test against a checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestOutcome {
    /// Fully qualified test name (e.g. "org.foo.BarTest::testBaz").
    pub test_name: String,

    pub status: TestStatus,

    /// First line of the failure, when known.
    pub error_message: Option<String>,

    /// Full failure block from the detailed report, when known.
    pub stack_trace: Option<String>,

    /// Wall time in seconds (0.0 when the tool did not report it).
    pub execution_time: f64,

    /// When the test outcome was observed.
    pub timestamp: DateTime<Utc>,
}

impl TestOutcome {
    /// A failing outcome with no detail yet, to be enriched later.
    pub fn failed(test_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            test_name: test_name.into(),
            status: TestStatus::Fail,
            error_message: None,
            stack_trace: None,
            execution_time: 0.0,
            timestamp,
        }
    }

    /// A passing outcome.
    pub fn passed(test_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: TestStatus::Pass,
            ..Self::failed(test_name, timestamp)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == TestStatus::Fail
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_execution_time(mut self, seconds: f64) -> Self {
        self.execution_time = seconds;
        self
    }
}

/// Severity of a synthesized log line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One synthesized log line. Order within a session is the simulated
/// chronology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// ISO-8601 timestamp.
    pub timestamp: String,

    pub level: LogLevel,

    /// Component tag (e.g. "build", "test_runner", "debugger").
    pub source: String,

    pub message: String,

    pub metadata: Option<Map<String, Value>>,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        source: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            level,
            source: source.to_string(),
            message: message.into(),
            metadata: None,
        }
    }

    /// Attach metadata. Non-object values are stored under a `"value"` key.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(match metadata {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        });
        self
    }
}

/// Render an instant the way log entries carry it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

/// One synthesized debugging narrative for one bug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebugSession {
    pub bug: BugRecord,
    pub test_outcomes: Vec<TestOutcome>,
    pub log_sequence: Vec<LogEntry>,
    pub timeline: Vec<String>,
    pub root_cause_summary: String,
}
