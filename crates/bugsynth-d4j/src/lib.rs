//! bugsynth-d4j: Defects4J mining for bugsynth
//!
//! - Invokes the `defects4j` CLI as a subprocess ([`runner`])
//! - Exposes bug metadata, checkouts, test runs and patches behind the
//!   [`BugDatabase`] trait
//! - Drives the per-bug mining loop and collects debug sessions

pub mod config;
pub mod database;
pub mod error;
pub mod fakes;
pub mod pipeline;
pub mod runner;

pub use config::{PipelineConfig, ToolConfig, DEFAULT_BINARY};
pub use database::{version_tag, BugDatabase, CheckoutVersion, Defects4j, FALLBACK_PROJECTS};
pub use error::{Result, ToolError};
pub use pipeline::{BugFailure, MiningPipeline, PipelineReport};
pub use runner::{ToolOutput, ToolRunner};
