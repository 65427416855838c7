//! Error taxonomy for bugsynth core operations.
//!
//! Parsing never fails (unmatched sections fall back to empty values), so the
//! only fallible surface in this crate is writing and reading dataset files.

use std::path::PathBuf;

/// bugsynth core errors.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export to {path:?} failed: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset record at {path:?} line {line}: {source}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for bugsynth core operations.
pub type Result<T> = std::result::Result<T, SynthError>;
