use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harness::SuiteConfig;
use crate::Mode;

/// Version of the JSON run summary layout.
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// One unit of work: a source file handed to the target executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCase {
    source: PathBuf,
}

impl BenchmarkCase {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Source path exactly as configured (relative to the suite's working directory).
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Name used for this case in reports.
    pub fn name(&self) -> String {
        self.source.to_string_lossy().into_owned()
    }
}

impl fmt::Display for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source.display())
    }
}

/// Why a single trial produced no sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The target exited with a nonzero status, or was killed by a signal (`code` is `None`).
    NonZeroExit { code: Option<i32>, stderr: String },
    /// The target was still running when the timeout elapsed and was terminated.
    Timeout { timeout_ms: u64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NonZeroExit { code: Some(code), .. } => {
                write!(f, "exited with status {code}")
            }
            FailureReason::NonZeroExit { code: None, .. } => f.write_str("terminated by signal"),
            FailureReason::Timeout { timeout_ms } => write!(f, "timed out after {timeout_ms} ms"),
        }
    }
}

/// Result of one timed invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrialOutcome {
    Success { elapsed_ms: f64 },
    Failure { reason: FailureReason },
}

impl TrialOutcome {
    pub fn elapsed_ms(&self) -> Option<f64> {
        match self {
            TrialOutcome::Success { elapsed_ms } => Some(*elapsed_ms),
            TrialOutcome::Failure { .. } => None,
        }
    }
}

/// Aggregated comparison for one benchmark case; one row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub benchmark: String,
    pub optimized_ms: f64,
    pub unoptimized_ms: f64,
    pub speedup: f64,
}

/// Why a case is absent from the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The source file did not exist; the target was never invoked.
    MissingSource,
    /// At least one mode produced no successful trial.
    InsufficientSamples { optimized_ok: usize, baseline_ok: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSource => f.write_str("source file not found"),
            SkipReason::InsufficientSamples {
                optimized_ok,
                baseline_ok,
            } => write!(
                f,
                "insufficient samples ({} {optimized_ok}, {} {baseline_ok})",
                Mode::Optimized,
                Mode::Baseline
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCase {
    pub benchmark: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub iterations: u32,
    pub timeout_ms: u64,
    pub executable: String,
    pub executable_sha256: Option<String>,
    pub timestamp_utc: DateTime<Utc>,
    pub git_sha: Option<String>,
}

impl RunMeta {
    /// Describes a run of `cfg` against `executable`, stamped now.
    pub fn capture(cfg: &SuiteConfig, executable: &Path) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: cfg.profile.as_str().to_string(),
            iterations: cfg.iterations,
            timeout_ms: duration_ms(cfg.timeout),
            executable: executable.display().to_string(),
            executable_sha256: file_sha256(executable),
            timestamp_utc: Utc::now(),
            git_sha: git_sha_from_env(),
        }
    }
}

/// Milliseconds in `d`, saturating.
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Hex digest of the measured binary; `None` when it cannot be read (e.g. resolved via `PATH`).
fn file_sha256(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    Some(format!("{:x}", Sha256::digest(&bytes)))
}

/// Commit of the measured build as exported by CI, abbreviated to 12 characters.
fn git_sha_from_env() -> Option<String> {
    ["GIT_SHA", "GITHUB_SHA"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .filter(|sha| !sha.is_empty())
        .map(|sha| sha.chars().take(12).collect())
}

/// Optional JSON summary written next to the CSV report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run: RunMeta,
    pub records: Vec<AggregateRecord>,
    pub skipped: Vec<SkippedCase>,
}
