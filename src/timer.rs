//! Wall-clock timing of a single trial.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::harness::TargetFlags;
use crate::runner::{Completion, Invoker};
use crate::schema::{BenchmarkCase, TrialOutcome};
use crate::Mode;

/// Argument list for one trial: `<source> [--no-opt] --profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    args: Vec<String>,
}

impl InvocationSpec {
    pub fn new(case: &BenchmarkCase, mode: Mode, flags: &TargetFlags) -> Self {
        let mut args = Vec::with_capacity(3);
        args.push(case.name());
        if mode == Mode::Baseline {
            args.push(flags.disable_optimization.clone());
        }
        args.push(flags.profile.clone());
        Self { args }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Runs one trial and measures it end to end, process startup included.
///
/// Failures are forwarded without timing.
pub fn time_trial<I: Invoker + ?Sized>(
    invoker: &I,
    case: &BenchmarkCase,
    mode: Mode,
    flags: &TargetFlags,
    timeout: Duration,
) -> Result<TrialOutcome> {
    let spec = InvocationSpec::new(case, mode, flags);

    let start = Instant::now();
    let completion = invoker.invoke(spec.args(), timeout)?;
    let elapsed = start.elapsed();

    Ok(match completion {
        Completion::Success => {
            let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
            debug!(case = %case, %mode, elapsed_ms, "trial finished");
            TrialOutcome::Success { elapsed_ms }
        }
        Completion::Failure(reason) => TrialOutcome::Failure { reason },
    })
}
