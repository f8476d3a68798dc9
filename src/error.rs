//! Fatal error types for a benchmark run.
//!
//! Per-trial failures (nonzero exit, timeout) and per-case skips are not
//! errors; they are recorded as data in [`crate::schema`]. Only conditions that
//! abort the whole run surface as [`BenchError`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for benchmark operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors that abort a benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The target executable could not be started.
    #[error("failed to start {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting on or terminating a started child failed.
    #[error("lost track of child process {}: {source}", executable.display())]
    Wait {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The report destination could not be created or written.
    #[error("cannot write report to {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A report file could not be opened.
    #[error("cannot read report from {}: {source}", path.display())]
    ReportRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A report file has an unexpected header.
    #[error("unexpected report header in {}: {found:?}", path.display())]
    ReportSchema { path: PathBuf, found: Vec<String> },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration for {parameter}: {reason}")]
    InvalidConfig { parameter: String, reason: String },
}

impl BenchError {
    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        BenchError::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}
