use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BenchError, Result};
use crate::schema::BenchmarkCase;

/// Target binary, relative to the invoking directory.
pub const DEFAULT_EXECUTABLE: &str = "build/compiler";
/// Directory benchmark sources are resolved against and the target runs in.
pub const DEFAULT_WORKDIR: &str = "benchmarks";
pub const DEFAULT_CASES: [&str; 3] = ["fib.src", "factorial.src", "sum_loop.src"];
pub const DEFAULT_REPORT_PATH: &str = "results/benchmarks.csv";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }

    pub fn iterations(&self) -> u32 {
        match self {
            Profile::Quick => 5,
            Profile::Full => 20,
        }
    }
}

/// Flags understood by the target executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetFlags {
    /// Disables the optimization pass; only passed in baseline mode.
    pub disable_optimization: String,
    /// Requests internal profiling output; always passed.
    pub profile: String,
}

impl Default for TargetFlags {
    fn default() -> Self {
        Self {
            disable_optimization: "--no-opt".to_string(),
            profile: "--profile".to_string(),
        }
    }
}

/// Everything a suite run reads. Immutable once the run starts.
#[derive(Clone, Debug)]
pub struct SuiteConfig {
    pub profile: Profile,
    pub cases: Vec<BenchmarkCase>,
    pub iterations: u32,
    pub timeout: Duration,
    pub workdir: PathBuf,
    pub flags: TargetFlags,
}

impl SuiteConfig {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            cases: DEFAULT_CASES.iter().map(BenchmarkCase::new).collect(),
            iterations: profile.iterations(),
            timeout: DEFAULT_TIMEOUT,
            workdir: PathBuf::from(DEFAULT_WORKDIR),
            flags: TargetFlags::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(BenchError::invalid_config("iterations", "must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(BenchError::invalid_config("timeout", "must be positive"));
        }
        Ok(())
    }

    /// Where the existence check looks for `case`.
    pub fn resolve(&self, case: &BenchmarkCase) -> PathBuf {
        self.workdir.join(case.source())
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::new(Profile::Quick)
    }
}

/// Parses a timeout given in seconds; zero, negative and non-finite values are rejected.
pub fn timeout_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            BenchError::invalid_config("timeout", format!("{secs} is not a positive duration"))
        })
}

/// Anchors a relative executable path with a directory component to `cwd`.
///
/// The target is started inside the suite's working directory, so
/// `build/compiler` must not be looked up there. Bare names are left for
/// `PATH` lookup and absolute paths are kept as given.
pub fn resolve_executable(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_relative() && path.components().count() > 1 {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}
