// THEORY:
// The benchmark harness isolates kernel cost. Both strategies run against the
// same channel planes with the same worker count, one strategy's iterations
// entirely before the other's, and each iteration still performs the full
// dispatch and merge so the measured work matches a real calculation. Only
// the total wall-clock time per strategy is kept; declaring a winner is left
// to whoever presents the result.

use crate::core_modules::channels::ChannelBuffers;
use crate::core_modules::kernel::Strategy;
use crate::error::{EngineError, EngineResult};
use crate::parallel_pipeline::HistogramEngine;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BenchmarkResult {
    pub iterations: usize,
    pub workers: usize,
    #[cfg_attr(feature = "serde", serde(rename = "scalar_ms", serialize_with = "crate::serialize_millis"))]
    pub scalar_elapsed: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "unrolled_ms", serialize_with = "crate::serialize_millis"))]
    pub unrolled_elapsed: Duration,
}

impl BenchmarkResult {
    pub fn elapsed(&self, strategy: Strategy) -> Duration {
        match strategy {
            Strategy::Scalar => self.scalar_elapsed,
            Strategy::Unrolled => self.unrolled_elapsed,
        }
    }

    /// `scalar / unrolled`; above 1.0 means the unrolled kernel was faster.
    pub fn ratio(&self) -> Option<f64> {
        let unrolled = self.unrolled_elapsed.as_secs_f64();
        (unrolled > 0.0).then(|| self.scalar_elapsed.as_secs_f64() / unrolled)
    }
}

/// Time source for the harness.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub fn run_benchmark(
    engine: &HistogramEngine,
    buffers: &ChannelBuffers,
    workers: usize,
    iterations: usize,
) -> EngineResult<BenchmarkResult> {
    run_benchmark_with_clock(engine, buffers, workers, iterations, &SystemClock)
}

/// Like [`run_benchmark`] but reads time from `clock`, once before the first
/// iteration of each strategy and once after every iteration.
pub fn run_benchmark_with_clock(
    engine: &HistogramEngine,
    buffers: &ChannelBuffers,
    workers: usize,
    iterations: usize,
    clock: &impl Clock,
) -> EngineResult<BenchmarkResult> {
    if iterations == 0 {
        return Err(EngineError::InvalidConfig(
            "benchmark needs at least one iteration".into(),
        ));
    }
    if workers == 0 {
        return Err(EngineError::InvalidConfig("worker count must be at least 1".into()));
    }

    let mut elapsed = [Duration::ZERO; Strategy::ALL.len()];
    for (slot, strategy) in elapsed.iter_mut().zip(Strategy::ALL) {
        let start = clock.now();
        let mut lap = start;
        for iteration in 0..iterations {
            engine.compute(buffers, workers, strategy)?;
            let now = clock.now();
            log::trace!("{strategy} iteration {iteration}: {:?}", now.duration_since(lap));
            lap = now;
        }
        *slot = lap.duration_since(start);
        log::debug!("{strategy}: {iterations} iterations in {:?}", *slot);
    }

    let result = BenchmarkResult {
        iterations,
        workers,
        scalar_elapsed: elapsed[0],
        unrolled_elapsed: elapsed[1],
    };
    log::debug!(
        "benchmark finished: scalar {:?}, unrolled {:?} ({} iterations, {} workers)",
        result.scalar_elapsed,
        result.unrolled_elapsed,
        iterations,
        workers
    );
    Ok(result)
}
