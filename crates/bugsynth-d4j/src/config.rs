//! Tool and pipeline configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default executable name of the bug-database CLI.
pub const DEFAULT_BINARY: &str = "defects4j";

/// Configuration for invoking the Defects4J CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolConfig {
    /// Executable name or path.
    pub binary: String,

    /// Defects4J installation root. When set, the executable is resolved
    /// as `<home>/framework/bin/<binary>`.
    pub home: Option<PathBuf>,

    /// Per-invocation timeout in seconds (0 disables the timeout).
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            home: None,
            timeout_secs: 0,
        }
    }
}

impl ToolConfig {
    /// The program to spawn.
    pub fn program(&self) -> PathBuf {
        match &self.home {
            Some(home) => home.join("framework").join("bin").join(&self.binary),
            None => PathBuf::from(&self.binary),
        }
    }
}

/// Configuration for one mining run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Directory receiving buggy-version checkouts.
    pub work_dir: PathBuf,

    /// Projects to mine, in order.
    pub projects: Vec<String>,

    /// Explicit bug ids; when `None` every bug of each project is mined.
    pub bug_ids: Option<Vec<String>>,

    /// Maximum number of bugs per project.
    pub limit: Option<usize>,

    /// Plain-text log receiving each bug's report URL and patch.
    pub report_log: Option<PathBuf>,

    /// Start instant shared by every synthesized session.
    pub started_at: DateTime<Utc>,
}

impl PipelineConfig {
    pub fn new(work_dir: impl Into<PathBuf>, projects: Vec<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            projects,
            bug_ids: None,
            limit: None,
            report_log: None,
            started_at: Utc::now(),
        }
    }
}
