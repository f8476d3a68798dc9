//! Reduces per-mode sample sets to a comparison record.

use crate::schema::{AggregateRecord, TrialOutcome};

/// Outcomes of the measured trials for one (case, mode) pair, in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    outcomes: Vec<TrialOutcome>,
}

impl SampleSet {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, outcome: TrialOutcome) {
        self.outcomes.push(outcome);
    }

    /// Elapsed times of successful trials; failures are dropped.
    pub fn successes(&self) -> impl Iterator<Item = f64> + '_ {
        self.outcomes.iter().filter_map(TrialOutcome::elapsed_ms)
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    /// Arithmetic mean of the successful samples, `None` without any.
    pub fn mean_ms(&self) -> Option<f64> {
        let (sum, n) = self
            .successes()
            .fold((0.0_f64, 0_usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }
}

impl FromIterator<TrialOutcome> for SampleSet {
    fn from_iter<T: IntoIterator<Item = TrialOutcome>>(iter: T) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// `unoptimized / optimized`, or 1.0 when the optimized time is not positive.
pub fn speedup(optimized_ms: f64, unoptimized_ms: f64) -> f64 {
    if optimized_ms > 0.0 {
        unoptimized_ms / optimized_ms
    } else {
        1.0
    }
}

/// Builds the record for one case, or `None` if either mode has no successful sample.
///
/// Means are rounded to 3 decimals; speedup is computed from the rounded means.
pub fn aggregate(
    benchmark: &str,
    optimized: &SampleSet,
    baseline: &SampleSet,
) -> Option<AggregateRecord> {
    let optimized_ms = round_to(optimized.mean_ms()?, 3);
    let unoptimized_ms = round_to(baseline.mean_ms()?, 3);
    Some(AggregateRecord {
        benchmark: benchmark.to_string(),
        optimized_ms,
        unoptimized_ms,
        speedup: speedup(optimized_ms, unoptimized_ms),
    })
}
