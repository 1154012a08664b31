// THEORY:
// This file is the main entry point for the `histobench` library crate.
// The public surface is small: a `HistogramSession` for front ends that want
// load/calculate/benchmark semantics, and the pieces beneath it for callers that
// want to drive the engine directly:
//
//   image -> ChannelBuffers -> partition -> counting kernels on the worker pool
//         -> HistogramBundle, optionally looped by `run_benchmark`.
//
// The counting kernels, the partitioner and the channel extractor live in
// `core_modules`; the reducer and its pool in `parallel_pipeline`.

pub mod benchmark;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use benchmark::{
    BenchmarkResult, Clock, SystemClock, run_benchmark, run_benchmark_with_clock,
};
pub use config::EngineConfig;
pub use core_modules::channels::{ChannelBuffers, PixelBuffer, load_channels};
pub use core_modules::histogram::{BINS, Channel, Histogram, HistogramBundle, MAX_PIXELS};
pub use core_modules::kernel::{CountingKernel, KernelError, Strategy};
pub use core_modules::partition::{Partition, partition};
pub use error::{EngineError, EngineErrorClass, EngineResult};
pub use parallel_pipeline::HistogramEngine;
pub use pipeline::{Calculation, ChannelsLoaded, HistogramSession};

#[cfg(feature = "serde")]
pub(crate) fn serialize_millis<S: serde::Serializer>(
    duration: &std::time::Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}
