//! bugsynth - synthetic debugging sessions from Defects4J bugs
//!
//! ## Commands
//!
//! - `projects`: List projects and their bug counts
//! - `run`: Mine bugs and export the dataset
//! - `parse-info`: Parse saved `defects4j info` output
//! - `inspect`: Summarize an exported JSONL dataset

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use bugsynth_core::{
    emit_export_written, export_dataset, parse_bug_metadata, read_jsonl, DebugSession,
};
use bugsynth_d4j::{BugDatabase, Defects4j, MiningPipeline, PipelineConfig, ToolConfig};

/// Log lines shown for the sample session.
const SAMPLE_LOG_LINES: usize = 5;

#[derive(Parser)]
#[command(name = "bugsynth")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synthesize debugging sessions from Defects4J bugs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    tool: ToolArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ToolArgs {
    /// Defects4J executable
    #[arg(
        long,
        global = true,
        env = "DEFECTS4J_BIN",
        default_value = bugsynth_d4j::DEFAULT_BINARY
    )]
    defects4j_bin: String,

    /// Defects4J installation root (executable at <home>/framework/bin)
    #[arg(long, global = true, env = "DEFECTS4J_HOME")]
    defects4j_home: Option<PathBuf>,

    /// Per-invocation timeout in seconds (0 = none)
    #[arg(long, global = true, env = "BUGSYNTH_TOOL_TIMEOUT", default_value = "0")]
    tool_timeout: u64,
}

impl ToolArgs {
    fn to_config(&self) -> ToolConfig {
        ToolConfig {
            binary: self.defects4j_bin.clone(),
            home: self.defects4j_home.clone(),
            timeout_secs: self.tool_timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List available projects and their bug counts
    Projects,

    /// Mine bugs and export debug sessions
    Run {
        /// Project to mine (repeatable; default: every project)
        #[arg(short, long = "project")]
        projects: Vec<String>,

        /// Bug id to mine (repeatable; default: every bug)
        #[arg(short, long = "bug")]
        bugs: Vec<String>,

        /// Maximum number of bugs per project
        #[arg(short, long)]
        limit: Option<usize>,

        /// Directory receiving checkouts
        #[arg(long, default_value = "./defects4j_work")]
        work_dir: PathBuf,

        /// Directory receiving the exported dataset
        #[arg(short, long, default_value = "./synthetic_logs")]
        output_dir: PathBuf,

        /// Plain-text log of report URLs and patches
        #[arg(long, default_value = "failing_tests.log")]
        report_log: PathBuf,

        /// Session start time (RFC 3339; default: now)
        #[arg(long, value_parser = parse_start_time)]
        start_time: Option<DateTime<Utc>>,
    },

    /// Parse saved `defects4j info` output and print it as JSON
    ParseInfo {
        /// Input file, or `-` for stdin
        input: PathBuf,
    },

    /// Summarize an exported JSONL dataset
    Inspect {
        /// Path to debug_sessions.jsonl
        path: PathBuf,
    },
}

fn parse_start_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 time '{s}': {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bugsynth_core::init_tracing(cli.json, level);

    let db = Defects4j::new(cli.tool.to_config());

    match cli.command {
        Commands::Projects => cmd_projects(&db).await,
        Commands::Run {
            projects,
            bugs,
            limit,
            work_dir,
            output_dir,
            report_log,
            start_time,
        } => {
            let projects = if projects.is_empty() {
                db.list_projects().await
            } else {
                projects
            };
            let mut config = PipelineConfig::new(work_dir, projects);
            config.bug_ids = (!bugs.is_empty()).then_some(bugs);
            config.limit = limit;
            config.report_log = Some(report_log);
            if let Some(t) = start_time {
                config.started_at = t;
            }
            cmd_run(&db, &config, &output_dir).await
        }
        Commands::ParseInfo { input } => cmd_parse_info(&input),
        Commands::Inspect { path } => cmd_inspect(&path),
    }
}

/// List projects with their bug counts
async fn cmd_projects(db: &dyn BugDatabase) -> Result<()> {
    let projects = db.list_projects().await;
    println!("{}", "=".repeat(80));
    println!("Available Defects4J Projects:");
    println!("{}", "=".repeat(80));
    for (i, project) in projects.iter().enumerate() {
        let count = match db.list_bug_ids(project).await {
            Ok(ids) => ids.len().to_string(),
            Err(e) => {
                tracing::warn!(project = %project, error = %e, "could not list bugs");
                "?".to_string()
            }
        };
        println!("{:2}. {:20} ({} bugs)", i + 1, project, count);
    }
    println!("{}", "=".repeat(80));
    Ok(())
}

/// Mine, export, and show a sample session
async fn cmd_run(db: &dyn BugDatabase, config: &PipelineConfig, output_dir: &Path) -> Result<()> {
    let report = MiningPipeline::run(db, config).await?;

    info!(
        sessions = report.sessions.len(),
        failures = report.failures.len(),
        "exporting debug sessions"
    );
    let paths = export_dataset(&report.sessions, output_dir, &report.run_id)
        .with_context(|| format!("Failed to export dataset to {}", output_dir.display()))?;
    emit_export_written(&paths.json, report.sessions.len());
    emit_export_written(&paths.jsonl, report.sessions.len());

    println!("Run:       {}", report.run_id);
    println!("Sessions:  {}", report.sessions.len());
    println!("Skipped:   {}", report.failures.len());
    for failure in &report.failures {
        println!("  - {}-{}: {}", failure.project, failure.bug_id, failure.error);
    }
    println!("Output:    {}", output_dir.display());

    if let Some(sample) = report.sessions.first() {
        print!("{}", render_sample(sample));
    }
    Ok(())
}

fn render_sample(session: &DebugSession) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\nSample Debug Session:\n{}\n", "=".repeat(80), "=".repeat(80)));
    out.push_str(&format!("Bug: {}\n", session.bug.label()));
    out.push_str("\nTimeline:\n");
    for step in &session.timeline {
        out.push_str(&format!("  - {step}\n"));
    }
    out.push_str(&format!("\nLog Sample (first {SAMPLE_LOG_LINES} entries):\n"));
    for log in session.log_sequence.iter().take(SAMPLE_LOG_LINES) {
        out.push_str(&format!(
            "  [{}] {:8} | {:12} | {}\n",
            log.timestamp,
            log.level.to_string(),
            log.source,
            log.message
        ));
    }
    out
}

/// Parse `defects4j info` output from a file or stdin
fn cmd_parse_info(input: &Path) -> Result<()> {
    let text = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };
    let metadata = parse_bug_metadata(&text);
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}

/// Summarize an exported JSONL dataset
fn cmd_inspect(path: &Path) -> Result<()> {
    let lines = read_jsonl(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut per_project: BTreeMap<&str, usize> = BTreeMap::new();
    for line in &lines {
        *per_project.entry(line.project.as_str()).or_default() += 1;
    }
    let total_logs: usize = lines.iter().map(|l| l.logs.len()).sum();

    println!("Sessions:  {}", lines.len());
    println!("Log lines: {}", total_logs);
    for (project, count) in &per_project {
        println!("  {project:20} {count}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugsynth_core::{synthesize_session, BugRecord};
    use chrono::TimeZone;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_start_time() {
        let t = parse_start_time("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
        assert!(parse_start_time("yesterday").is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "bugsynth", "run", "-p", "Lang", "-p", "Math", "--bug", "3", "--limit", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                projects,
                bugs,
                limit,
                report_log,
                ..
            } => {
                assert_eq!(projects, vec!["Lang", "Math"]);
                assert_eq!(bugs, vec!["3"]);
                assert_eq!(limit, Some(2));
                assert_eq!(report_log, PathBuf::from("failing_tests.log"));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_render_sample_shows_five_log_lines() {
        let mut bug = BugRecord::new("Lang", "1");
        bug.modified_classes = vec!["a.A".to_string()];
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let session = synthesize_session(&bug, &[], start);

        let text = render_sample(&session);
        assert!(text.contains("Bug: Lang-1"));
        assert!(text.contains("  - Started investigating Lang bug #1"));
        assert!(text.contains("[2024-01-15T10:30:00Z] INFO     | build        | Building Lang project (bug 1)"));
        assert_eq!(text.lines().filter(|l| l.starts_with("  [")).count(), 5);
    }

    #[test]
    fn test_inspect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cmd_inspect(&dir.path().join("none.jsonl")).is_err());
    }
}
