use clap::ValueEnum;

pub mod aggregate;
pub mod driver;
pub mod error;
pub mod harness;
pub mod report;
pub mod runner;
pub mod schema;
pub mod timer;

pub use error::{BenchError, Result};

/// Configuration the target is measured under.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum Mode {
    /// Target's optimization pass enabled.
    #[default]
    Optimized,
    /// Target's optimization pass disabled.
    Baseline,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Optimized => "optimized",
            Mode::Baseline => "baseline",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
