//! In-memory bug database (testing only)
//!
//! `ScriptedBugDatabase` answers every [`BugDatabase`] call from scripted
//! bugs, so pipeline behavior can be tested without Defects4J installed.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use bugsynth_core::model::{BugRecord, TestOutcome};

use crate::database::{BugDatabase, CheckoutVersion};
use crate::error::{Result, ToolError};

/// One scripted bug: its metadata, the outcomes a test run reports, and its
/// patch.
#[derive(Debug, Clone)]
pub struct ScriptedBug {
    pub record: BugRecord,
    pub outcomes: Vec<TestOutcome>,
    pub patch: String,
}

impl ScriptedBug {
    pub fn new(record: BugRecord, outcomes: Vec<TestOutcome>, patch: impl Into<String>) -> Self {
        Self {
            record,
            outcomes,
            patch: patch.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    projects: Vec<String>,
    bugs: HashMap<String, Vec<ScriptedBug>>,
    broken_checkouts: HashSet<(String, String)>,
    checkouts: HashMap<PathBuf, (String, String)>,
    calls: Vec<String>,
}

/// In-memory [`BugDatabase`] driven by [`ScriptedBug`]s.
#[derive(Debug, Default)]
pub struct ScriptedBugDatabase {
    script: Mutex<Script>,
}

impl ScriptedBugDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bug; its project is listed in insertion order.
    pub fn with_bug(self, bug: ScriptedBug) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            let project = bug.record.project.clone();
            if !script.projects.contains(&project) {
                script.projects.push(project.clone());
            }
            script.bugs.entry(project).or_default().push(bug);
        }
        self
    }

    /// Make checking out this bug fail with a non-zero exit.
    pub fn with_broken_checkout(self, project: &str, bug_id: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .broken_checkouts
            .insert((project.to_string(), bug_id.to_string()));
        self
    }

    /// Every call received so far, as `"<method> <args>"`.
    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn record_call(&self, call: String) {
        self.script.lock().unwrap().calls.push(call);
    }

    fn find(&self, project: &str, bug_id: &str) -> Result<ScriptedBug> {
        let script = self.script.lock().unwrap();
        script
            .bugs
            .get(project)
            .and_then(|bugs| bugs.iter().find(|b| b.record.bug_id == bug_id))
            .cloned()
            .ok_or_else(|| ToolError::NonZeroExit {
                command: format!("defects4j info -p {project} -b {bug_id}"),
                code: 1,
                stderr: format!("Error: {project}-{bug_id} does not exist"),
            })
    }
}

#[async_trait]
impl BugDatabase for ScriptedBugDatabase {
    async fn list_projects(&self) -> Vec<String> {
        self.record_call("list_projects".to_string());
        self.script.lock().unwrap().projects.clone()
    }

    async fn list_bug_ids(&self, project: &str) -> Result<Vec<String>> {
        self.record_call(format!("list_bug_ids {project}"));
        let script = self.script.lock().unwrap();
        script
            .bugs
            .get(project)
            .map(|bugs| bugs.iter().map(|b| b.record.bug_id.clone()).collect())
            .ok_or_else(|| ToolError::NonZeroExit {
                command: format!("defects4j bids -p {project}"),
                code: 1,
                stderr: format!("Error: unknown project {project}"),
            })
    }

    async fn bug_info(&self, project: &str, bug_id: &str) -> Result<BugRecord> {
        self.record_call(format!("bug_info {project} {bug_id}"));
        let mut record = self.find(project, bug_id)?.record;
        record.patch.clear();
        record.checkout_path = None;
        Ok(record)
    }

    async fn checkout(
        &self,
        project: &str,
        bug_id: &str,
        work_dir: &Path,
        version: CheckoutVersion,
    ) -> Result<PathBuf> {
        self.record_call(format!("checkout {project} {bug_id}{}", version.suffix()));
        let mut script = self.script.lock().unwrap();
        if script
            .broken_checkouts
            .contains(&(project.to_string(), bug_id.to_string()))
        {
            return Err(ToolError::NonZeroExit {
                command: format!("defects4j checkout -p {project} -v {bug_id}{}", version.suffix()),
                code: 1,
                stderr: "Could not checkout revision".to_string(),
            });
        }
        let path = work_dir.join(format!("{project}_{bug_id}_{}", version.suffix()));
        script
            .checkouts
            .insert(path.clone(), (project.to_string(), bug_id.to_string()));
        Ok(path)
    }

    async fn run_tests(&self, checkout: &Path, tests: &[String]) -> Result<Vec<TestOutcome>> {
        self.record_call(format!("run_tests {} [{}]", checkout.display(), tests.join(",")));
        let (project, bug_id) = self
            .script
            .lock()
            .unwrap()
            .checkouts
            .get(checkout)
            .cloned()
            .ok_or_else(|| {
                ToolError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} is not a checkout", checkout.display()),
                ))
            })?;
        Ok(self.find(&project, &bug_id)?.outcomes)
    }

    async fn export_patch(&self, project: &str, bug_id: &str, _checkout: &Path) -> Result<String> {
        self.record_call(format!("export_patch {project} {bug_id}"));
        Ok(self.find(project, bug_id)?.patch)
    }
}
