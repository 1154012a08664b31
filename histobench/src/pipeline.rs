// THEORY:
// The `pipeline` module is the top-level API for a front end. A
// `HistogramSession` plays the part of a processing service behind a UI: it
// owns the engine, remembers the last loaded image's channels so they can be
// recalculated or benchmarked repeatedly, and answers every request with exactly
// one terminal value (a notification on success, an error otherwise).
//
// The session is the only place that holds "current" settings. It passes them
// explicitly into the engine and harness, which stay pure with respect to their
// inputs.

use crate::benchmark::{BenchmarkResult, run_benchmark};
use crate::config::EngineConfig;
use crate::core_modules::channels::{ChannelBuffers, load_channels};
use crate::core_modules::histogram::HistogramBundle;
use crate::core_modules::kernel::Strategy;
use crate::error::{EngineError, EngineResult};
use crate::parallel_pipeline::HistogramEngine;
use std::path::Path;
use std::time::{Duration, Instant};

/// Sent once channels of a new image are ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChannelsLoaded {
    pub width: u32,
    pub height: u32,
    pub pixels: usize,
}

/// Sent once a calculation completes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Calculation {
    #[cfg_attr(feature = "serde", serde(rename = "elapsed_ms", serialize_with = "crate::serialize_millis"))]
    pub elapsed: Duration,
    pub workers: usize,
    pub strategy: Strategy,
    pub histograms: HistogramBundle,
}

pub struct HistogramSession {
    engine: HistogramEngine,
    config: EngineConfig,
    channels: Option<ChannelBuffers>,
    last_histograms: Option<HistogramBundle>,
}

impl HistogramSession {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: HistogramEngine::new(config.workers)?,
            config,
            channels: None,
            last_histograms: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn channels_are_loaded(&self) -> bool {
        self.channels.is_some()
    }

    pub fn channels(&self) -> Option<&ChannelBuffers> {
        self.channels.as_ref()
    }

    /// Histograms of the last successful calculation.
    pub fn last_histograms(&self) -> Option<&HistogramBundle> {
        self.last_histograms.as_ref()
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.config.strategy = strategy;
        log::info!("Strategy changed ({strategy})");
    }

    /// Resizes the worker pool when the count actually changes.
    pub fn set_workers(&mut self, workers: usize) -> EngineResult<()> {
        if workers == 0 {
            return Err(EngineError::InvalidConfig("worker count must be at least 1".into()));
        }
        if workers != self.engine.threads() {
            self.engine = HistogramEngine::new(workers)?;
        }
        self.config.workers = workers;
        log::info!("Tasks: {workers}");
        Ok(())
    }

    pub fn set_iterations(&mut self, iterations: usize) -> EngineResult<()> {
        if iterations == 0 {
            return Err(EngineError::InvalidConfig(
                "benchmark needs at least one iteration".into(),
            ));
        }
        self.config.iterations = iterations;
        log::info!("Iterations: {iterations}");
        Ok(())
    }

    /// Replaces the retained channels. A failed load keeps the previous ones.
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> EngineResult<ChannelsLoaded> {
        let channels = load_channels(path.as_ref())?;
        log::debug!(
            "Loading image \"{}\" ({} x {}) Total {} pixels",
            path.as_ref().display(),
            channels.width(),
            channels.height(),
            channels.pixel_count()
        );
        Ok(self.load_channels(channels))
    }

    pub fn load_channels(&mut self, channels: ChannelBuffers) -> ChannelsLoaded {
        let loaded = ChannelsLoaded {
            width: channels.width(),
            height: channels.height(),
            pixels: channels.pixel_count(),
        };
        self.channels = Some(channels);
        log::debug!("Image loaded successfully");
        loaded
    }

    /// Computes histograms of the retained channels with the current settings.
    /// On failure the previous histograms are left untouched.
    pub fn calculate(&mut self) -> EngineResult<Calculation> {
        let channels = self.loaded()?;
        let (workers, strategy) = (self.config.workers, self.config.strategy);

        let start = Instant::now();
        let histograms = self.engine.compute(channels, workers, strategy)?;
        let elapsed = start.elapsed();

        log::debug!(
            "Histograms calculated successfully (using {workers} task{}, elapsed: {} ms).",
            if workers == 1 { "" } else { "s" },
            elapsed.as_millis()
        );
        self.last_histograms = Some(histograms.clone());
        Ok(Calculation {
            elapsed,
            workers,
            strategy,
            histograms,
        })
    }

    pub fn run_benchmark(&self) -> EngineResult<BenchmarkResult> {
        let channels = self.loaded()?;
        log::debug!("Running benchmark (iterations: {})...", self.config.iterations);
        run_benchmark(
            &self.engine,
            channels,
            self.config.workers,
            self.config.iterations,
        )
    }

    fn loaded(&self) -> EngineResult<&ChannelBuffers> {
        self.channels
            .as_ref()
            .ok_or_else(|| EngineError::InvalidInput("no image loaded".into()))
    }
}
