//! Dataset export.
//!
//! Sessions are written in two shapes:
//! - `debug_sessions.json`: one pretty-printed array of full records
//! - `debug_sessions.jsonl`: one reduced record per line (no test outcomes)
//!
//! A `manifest.json` next to them carries the SHA-256 of every exported file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Result, SynthError};
use crate::model::{BugRecord, DebugSession, LogEntry, TestOutcome};

/// File name of the full JSON export.
pub const JSON_FILE_NAME: &str = "debug_sessions.json";

/// File name of the line-delimited export.
pub const JSONL_FILE_NAME: &str = "debug_sessions.jsonl";

/// File name of the export manifest.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Full per-session record in `debug_sessions.json`.
#[derive(Debug, Serialize)]
pub struct SessionRecord<'a> {
    pub bug_id: String,
    pub project: &'a str,
    pub bug_info: &'a BugRecord,
    pub logs: &'a [LogEntry],
    pub timeline: &'a [String],
    pub root_cause: &'a str,
    pub test_failures: &'a [TestOutcome],
}

impl<'a> From<&'a DebugSession> for SessionRecord<'a> {
    fn from(session: &'a DebugSession) -> Self {
        Self {
            bug_id: session.bug.dataset_key(),
            project: &session.bug.project,
            bug_info: &session.bug,
            logs: &session.log_sequence,
            timeline: &session.timeline,
            root_cause: &session.root_cause_summary,
            test_failures: &session.test_outcomes,
        }
    }
}

/// Reduced per-session record, one per line of `debug_sessions.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionLine {
    pub bug_id: String,
    pub project: String,
    pub logs: Vec<LogEntry>,
    pub timeline: Vec<String>,
    pub root_cause: String,
}

impl From<&DebugSession> for SessionLine {
    fn from(session: &DebugSession) -> Self {
        Self {
            bug_id: session.bug.dataset_key(),
            project: session.bug.project.clone(),
            logs: session.log_sequence.clone(),
            timeline: session.timeline.clone(),
            root_cause: session.root_cause_summary.clone(),
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| SynthError::Export {
            path: path.to_path_buf(),
            source,
        })
}

/// Write every session as one pretty-printed JSON array.
pub fn export_json(sessions: &[DebugSession], path: &Path) -> Result<()> {
    let records: Vec<SessionRecord<'_>> = sessions.iter().map(SessionRecord::from).collect();
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, &records)?;
    out.flush()?;
    debug!(path = %path.display(), sessions = sessions.len(), "wrote json export");
    Ok(())
}

/// Write one reduced JSON record per line.
pub fn export_jsonl(sessions: &[DebugSession], path: &Path) -> Result<()> {
    let mut out = create(path)?;
    for session in sessions {
        serde_json::to_writer(&mut out, &SessionLine::from(session))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    debug!(path = %path.display(), sessions = sessions.len(), "wrote jsonl export");
    Ok(())
}

/// Read back a `debug_sessions.jsonl` file. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<SessionLine>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| SynthError::MalformedRecord {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        lines.push(record);
    }
    Ok(lines)
}

/// Append one bug's report URL and patch to the plain-text evidence log.
pub fn append_bug_report(path: &Path, bug: &BugRecord) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SynthError::Export {
            path: path.to_path_buf(),
            source,
        })?;
    let label = bug.label();
    write!(
        file,
        "report for {label}:\n{}\npatch for {label}:\n{}\n\n\n",
        bug.bug_report_url, bug.patch
    )?;
    Ok(())
}

/// Digest of one exported file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportedFile {
    pub name: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Summary of one export, written as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportManifest {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub session_count: usize,
    pub files: Vec<ExportedFile>,
}

/// SHA-256 hex of a file's content.
pub fn file_digest(path: &Path) -> Result<ExportedFile> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ExportedFile {
        name,
        sha256: hex::encode(Sha256::digest(&bytes)),
        bytes: bytes.len() as u64,
    })
}

/// Hash `files` and write `manifest.json` into `dir`. Returns the manifest path.
pub fn export_manifest(
    dir: &Path,
    run_id: &str,
    session_count: usize,
    files: &[PathBuf],
) -> Result<PathBuf> {
    let manifest = ExportManifest {
        run_id: run_id.to_string(),
        generated_at: Utc::now(),
        session_count,
        files: files
            .iter()
            .map(|f| file_digest(f))
            .collect::<Result<Vec<_>>>()?,
    };
    let path = dir.join(MANIFEST_FILE_NAME);
    let mut out = create(&path)?;
    serde_json::to_writer_pretty(&mut out, &manifest)?;
    out.flush()?;
    Ok(path)
}

/// Paths of the full export set written by [`export_dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub jsonl: PathBuf,
    pub manifest: PathBuf,
}

/// Write the JSON, JSONL and manifest files into `dir` (created if missing).
pub fn export_dataset(sessions: &[DebugSession], dir: &Path, run_id: &str) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)?;
    let json = dir.join(JSON_FILE_NAME);
    let jsonl = dir.join(JSONL_FILE_NAME);
    export_json(sessions, &json)?;
    export_jsonl(sessions, &jsonl)?;
    let manifest = export_manifest(dir, run_id, sessions.len(), &[json.clone(), jsonl.clone()])?;
    Ok(ExportPaths {
        json,
        jsonl,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_bug_report_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failing_tests.log");
        let mut bug = BugRecord::new("Lang", "1");
        bug.bug_report_url = "https://issues.apache.org/jira/browse/LANG-747".to_string();
        bug.patch = "-a\n+b".to_string();

        append_bug_report(&path, &bug).unwrap();
        append_bug_report(&path, &BugRecord::new("Lang", "2")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "report for Lang-1:\nhttps://issues.apache.org/jira/browse/LANG-747\npatch for Lang-1:\n-a\n+b\n\n\n\
             report for Lang-2:\n\npatch for Lang-2:\n\n\n\n"
        );
    }

    #[test]
    fn test_file_digest_known_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, b"abc").unwrap();
        let digest = file_digest(&path).unwrap();
        assert_eq!(digest.name, "x.txt");
        assert_eq!(digest.bytes, 3);
        assert_eq!(
            digest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_read_jsonl_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "\n{oops}\n").unwrap();
        match read_jsonl(&path) {
            Err(SynthError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed record error, got {other:?}"),
        }
    }

    #[test]
    fn test_export_to_missing_dir_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = export_json(&[], &path).unwrap_err();
        assert!(matches!(err, SynthError::Export { .. }));
    }
}
