//! Sequential suite execution.
//!
//! Cases run strictly in configured order. Within a case the warm-up comes
//! first, then every optimized trial, then every baseline trial. Nothing runs
//! concurrently: overlapping target processes would contend for CPU and cache
//! and skew the comparison.

use tracing::{info, warn};

use crate::aggregate::{aggregate, SampleSet};
use crate::error::Result;
use crate::harness::SuiteConfig;
use crate::runner::Invoker;
use crate::schema::{
    AggregateRecord, BenchmarkCase, FailureReason, SkipReason, SkippedCase, TrialOutcome,
};
use crate::timer::time_trial;
use crate::Mode;

/// Records for measured cases plus the cases left out, both in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteOutcome {
    pub records: Vec<AggregateRecord>,
    pub skipped: Vec<SkippedCase>,
}

pub fn run_suite<I: Invoker + ?Sized>(invoker: &I, cfg: &SuiteConfig) -> Result<SuiteOutcome> {
    cfg.validate()?;

    let mut outcome = SuiteOutcome::default();
    for case in &cfg.cases {
        match run_case(invoker, cfg, case)? {
            Ok(record) => outcome.records.push(record),
            Err(reason) => outcome.skipped.push(SkippedCase {
                benchmark: case.name(),
                reason,
            }),
        }
    }
    Ok(outcome)
}

/// Measures one case. The inner `Err` is a skip, not a fatal error.
fn run_case<I: Invoker + ?Sized>(
    invoker: &I,
    cfg: &SuiteConfig,
    case: &BenchmarkCase,
) -> Result<std::result::Result<AggregateRecord, SkipReason>> {
    let path = cfg.resolve(case);
    if !path.exists() {
        warn!(case = %case, path = %path.display(), "benchmark source not found, skipping");
        return Ok(Err(SkipReason::MissingSource));
    }

    info!(case = %case, iterations = cfg.iterations, "running benchmark");

    // Warm-up primes file and page caches; its result never counts.
    let _ = time_trial(invoker, case, Mode::Optimized, &cfg.flags, cfg.timeout)?;

    let optimized = collect_samples(invoker, cfg, case, Mode::Optimized)?;
    let baseline = collect_samples(invoker, cfg, case, Mode::Baseline)?;

    match aggregate(&case.name(), &optimized, &baseline) {
        Some(record) => {
            info!(
                case = %case,
                "optimized: {:.3}ms, unoptimized: {:.3}ms, speedup: {:.2}x",
                record.optimized_ms,
                record.unoptimized_ms,
                record.speedup
            );
            Ok(Ok(record))
        }
        None => {
            let reason = SkipReason::InsufficientSamples {
                optimized_ok: optimized.success_count(),
                baseline_ok: baseline.success_count(),
            };
            warn!(case = %case, "{reason}, omitting from report");
            Ok(Err(reason))
        }
    }
}

fn collect_samples<I: Invoker + ?Sized>(
    invoker: &I,
    cfg: &SuiteConfig,
    case: &BenchmarkCase,
    mode: Mode,
) -> Result<SampleSet> {
    let mut samples = SampleSet::with_capacity(cfg.iterations as usize);
    for trial in 0..cfg.iterations {
        let outcome = time_trial(invoker, case, mode, &cfg.flags, cfg.timeout)?;
        if let TrialOutcome::Failure { reason } = &outcome {
            log_failure(case, mode, trial, reason);
        }
        samples.push(outcome);
    }
    Ok(samples)
}

fn log_failure(case: &BenchmarkCase, mode: Mode, trial: u32, reason: &FailureReason) {
    match reason {
        FailureReason::NonZeroExit { stderr, .. } => {
            warn!(case = %case, %mode, trial, stderr = %stderr.trim_end(), "error running benchmark: {reason}");
        }
        FailureReason::Timeout { .. } => {
            warn!(case = %case, %mode, trial, "timeout running benchmark: {reason}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BenchError;
    use crate::runner::Completion;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::thread;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tracing::Level;
    use tracing_subscriber::fmt;

    fn init_test_logging() {
        let _ = fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    /// Fake target: per-source behaviour keyed on the first argument, with a call log.
    #[derive(Default)]
    struct Scripted {
        calls: RefCell<Vec<Vec<String>>>,
        behaviour: HashMap<String, Behaviour>,
    }

    #[derive(Clone)]
    enum Behaviour {
        /// Sleep for `opt` in optimized mode and `base` in baseline mode, then succeed.
        Delay { opt: Duration, base: Duration },
        /// Fail every trial in the given mode; succeed instantly otherwise.
        FailIn(Mode),
        /// Fail the first `n` calls with a nonzero exit, then succeed.
        FlakyFirst(usize),
    }

    impl Scripted {
        fn with(mut self, source: &str, b: Behaviour) -> Self {
            self.behaviour.insert(source.to_string(), b);
            self
        }

        fn calls_for(&self, source: &str) -> Vec<Vec<String>> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c[0] == source)
                .cloned()
                .collect()
        }
    }

    impl Invoker for Scripted {
        fn invoke(&self, args: &[String], _timeout: Duration) -> crate::Result<Completion> {
            let prior = self.calls_for(&args[0]).len();
            self.calls.borrow_mut().push(args.to_vec());
            let baseline = args.iter().any(|a| a == "--no-opt");
            let fail = || {
                Completion::Failure(FailureReason::NonZeroExit {
                    code: Some(1),
                    stderr: "scripted failure".into(),
                })
            };
            Ok(match self.behaviour.get(&args[0]) {
                Some(Behaviour::Delay { opt, base }) => {
                    thread::sleep(if baseline { *base } else { *opt });
                    Completion::Success
                }
                Some(Behaviour::FailIn(mode)) => {
                    if (*mode == Mode::Baseline) == baseline {
                        fail()
                    } else {
                        Completion::Success
                    }
                }
                Some(Behaviour::FlakyFirst(n)) if prior < *n => fail(),
                _ => Completion::Success,
            })
        }
    }

    fn suite(dir: &TempDir, present: &[&str], cases: &[&str], iterations: u32) -> SuiteConfig {
        for name in present {
            std::fs::write(dir.path().join(name), "print 1;").unwrap();
        }
        SuiteConfig {
            cases: cases.iter().map(BenchmarkCase::new).collect(),
            iterations,
            workdir: dir.path().to_path_buf(),
            ..SuiteConfig::default()
        }
    }

    #[test]
    fn test_trial_order_within_case() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["a.src"], &["a.src"], 3);
        let fake = Scripted::default();

        let out = run_suite(&fake, &cfg).unwrap();
        assert_eq!(out.records.len(), 1);

        let calls = fake.calls.borrow();
        // warm-up + 3 optimized + 3 baseline
        assert_eq!(calls.len(), 7);
        for call in &calls[..4] {
            assert_eq!(call, &["a.src", "--profile"]);
        }
        for call in &calls[4..] {
            assert_eq!(call, &["a.src", "--no-opt", "--profile"]);
        }
    }

    #[test]
    fn test_cases_processed_in_input_order_without_interleaving() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let names = ["c.src", "a.src", "b.src"];
        let cfg = suite(&dir, &names, &names, 2);
        let fake = Scripted::default();

        let out = run_suite(&fake, &cfg).unwrap();
        let reported: Vec<&str> = out.records.iter().map(|r| r.benchmark.as_str()).collect();
        assert_eq!(reported, names);

        let sources: Vec<String> = fake.calls.borrow().iter().map(|c| c[0].clone()).collect();
        let mut expected = Vec::new();
        for name in names {
            expected.extend(std::iter::repeat(name.to_string()).take(5));
        }
        assert_eq!(sources, expected);
    }

    #[test]
    fn test_missing_source_never_invoked() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["b.src"], &["a.src", "b.src"], 2);
        let fake = Scripted::default();

        let out = run_suite(&fake, &cfg).unwrap();
        assert!(fake.calls_for("a.src").is_empty());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].benchmark, "b.src");
        assert_eq!(
            out.skipped,
            [SkippedCase {
                benchmark: "a.src".into(),
                reason: SkipReason::MissingSource,
            }]
        );
    }

    #[test]
    fn test_case_failing_one_mode_is_omitted() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["a.src", "b.src"], &["a.src", "b.src"], 3);
        let fake = Scripted::default().with("a.src", Behaviour::FailIn(Mode::Baseline));

        let out = run_suite(&fake, &cfg).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].benchmark, "b.src");
        assert_eq!(
            out.skipped[0].reason,
            SkipReason::InsufficientSamples {
                optimized_ok: 3,
                baseline_ok: 0,
            }
        );
        // No retries: exactly iterations trials per mode, plus warm-up.
        assert_eq!(fake.calls_for("a.src").len(), 7);
    }

    #[test]
    fn test_warmup_failure_is_discarded() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["a.src"], &["a.src"], 2);
        // Only the warm-up fails.
        let fake = Scripted::default().with("a.src", Behaviour::FlakyFirst(1));

        let out = run_suite(&fake, &cfg).unwrap();
        assert_eq!(out.records.len(), 1);
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn test_speedup_reflects_relative_delays() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["a.src"], &["a.src"], 3);
        let fake = Scripted::default().with(
            "a.src",
            Behaviour::Delay {
                opt: Duration::from_millis(20),
                base: Duration::from_millis(60),
            },
        );

        let out = run_suite(&fake, &cfg).unwrap();
        let rec = &out.records[0];
        assert!(rec.optimized_ms >= 20.0);
        assert!(rec.unoptimized_ms >= 60.0);
        assert!(rec.speedup > 1.5 && rec.speedup < 3.5, "speedup {}", rec.speedup);
    }

    #[test]
    fn test_invalid_config_rejected_before_any_trial() {
        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["a.src"], &["a.src"], 0);
        let fake = Scripted::default();

        let err = run_suite(&fake, &cfg).unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig { .. }));
        assert!(fake.calls.borrow().is_empty());
    }

    #[test]
    fn test_fatal_invoker_error_aborts_suite() {
        struct Unstartable;
        impl Invoker for Unstartable {
            fn invoke(&self, _: &[String], _: Duration) -> crate::Result<Completion> {
                Err(BenchError::Spawn {
                    executable: PathBuf::from("build/compiler"),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
            }
        }

        let dir = tempdir().unwrap();
        let cfg = suite(&dir, &["a.src"], &["a.src"], 1);
        assert!(matches!(
            run_suite(&Unstartable, &cfg),
            Err(BenchError::Spawn { .. })
        ));
    }
}
