//! Micro-benchmark timing: run a closure many times and report the total.

use std::time::{Duration, Instant};

/// Calls per measurement when none is given
pub const DEFAULT_NUMBER: u64 = 1_000_000;

/// Measurements per [`Timing`] when none is given
pub const DEFAULT_REPEAT: usize = 5;

/// Total time taken by `number` calls of `f`
pub fn timeit<F: FnMut()>(number: u64, mut f: F) -> Duration {
    let start = Instant::now();
    for _ in 0..number {
        f();
    }
    start.elapsed()
}

/// `repeat` independent [`timeit`] measurements
pub fn repeat<F: FnMut()>(repeat: usize, number: u64, mut f: F) -> Vec<Duration> {
    (0..repeat).map(|_| timeit(number, &mut f)).collect()
}

/// Like [`repeat`], but stops starting new measurements once their total
/// exceeds `budget`. At least one measurement is always taken.
pub fn repeat_within<F: FnMut()>(
    repeat: usize,
    number: u64,
    budget: Duration,
    mut f: F,
) -> Vec<Duration> {
    let mut runs = Vec::with_capacity(repeat);
    let mut spent = Duration::ZERO;
    for _ in 0..repeat.max(1) {
        let run = timeit(number, &mut f);
        spent += run;
        runs.push(run);
        if spent >= budget {
            break;
        }
    }
    runs
}

/// Repeated measurements of one labelled snippet
#[derive(Debug, Clone)]
pub struct Timing {
    pub label: String,
    pub number: u64,
    pub runs: Vec<Duration>,
}

impl Timing {
    pub fn measure<F: FnMut()>(label: impl Into<String>, runs: usize, number: u64, f: F) -> Self {
        let label = label.into();
        let runs = repeat(runs.max(1), number, f);
        tracing::debug!(%label, number, runs = runs.len(), "timed snippet");
        Timing {
            label,
            number,
            runs,
        }
    }

    /// Same as [`Timing::measure`], bounded by a time budget
    pub fn measure_within<F: FnMut()>(
        label: impl Into<String>,
        runs: usize,
        number: u64,
        budget: Duration,
        f: F,
    ) -> Self {
        let label = label.into();
        let runs = repeat_within(runs, number, budget, f);
        tracing::debug!(%label, number, runs = runs.len(), ?budget, "timed snippet within budget");
        Timing {
            label,
            number,
            runs,
        }
    }

    /// Fastest run; the least disturbed by other load
    pub fn best(&self) -> Duration {
        self.runs.iter().min().copied().unwrap_or_default()
    }

    /// Per-call time of the fastest run
    pub fn per_call(&self) -> Duration {
        if self.number == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.best().as_nanos() / self.number as u128) as u64)
    }
}
