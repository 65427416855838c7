//! bugsynth core library
//!
//! Turns Defects4J evidence into synthetic debugging sessions:
//! - [`parser`]: best-effort parsing of the tool's text output
//! - [`synth`]: deterministic, time-ordered session generation
//! - [`export`]: JSON / JSONL dataset files

pub mod error;
pub mod export;
pub mod model;
pub mod obs;
pub mod parser;
pub mod synth;
pub mod telemetry;

pub use error::{Result, SynthError};
pub use export::{
    append_bug_report, export_dataset, export_json, export_jsonl, export_manifest, read_jsonl,
    ExportManifest, ExportPaths, ExportedFile, SessionLine, SessionRecord, JSONL_FILE_NAME,
    JSON_FILE_NAME, MANIFEST_FILE_NAME,
};
pub use model::{BugRecord, DebugSession, LogEntry, LogLevel, TestOutcome, TestStatus};
pub use obs::{bug_span, emit_bug_failed, emit_bug_finished, emit_bug_started, emit_export_written};
pub use parser::{
    enrich_with_failure_details, extract_detailed_failure, parse_bug_metadata,
    parse_multi_test_results, parse_single_test_result, BugMetadata,
};
pub use synth::{root_cause_summary, synthesize_session, RootCauseCategory};
pub use telemetry::init_tracing;

/// bugsynth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
