use crate::core_modules::kernel::Strategy;
use crate::error::{EngineError, EngineResult};

pub const WORKERS_ENV: &str = "HISTOBENCH_WORKERS";
pub const STRATEGY_ENV: &str = "HISTOBENCH_STRATEGY";
pub const ITERATIONS_ENV: &str = "HISTOBENCH_ITERATIONS";

pub const DEFAULT_ITERATIONS: usize = 10;

/// Caller-facing knobs of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Counting tasks per channel, and the size of the worker pool.
    pub workers: usize,
    /// Kernel used by plain calculations.
    pub strategy: Strategy,
    /// Runs per strategy in a benchmark.
    pub iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            strategy: Strategy::default(),
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with any `HISTOBENCH_*` variables that are set.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> EngineResult<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(WORKERS_ENV) {
            config.workers = parse_positive(WORKERS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(STRATEGY_ENV) {
            config.strategy = raw
                .parse()
                .map_err(|e| EngineError::InvalidConfig(format!("{STRATEGY_ENV}: {e}")))?;
        }
        if let Some(raw) = lookup(ITERATIONS_ENV) {
            config.iterations = parse_positive(ITERATIONS_ENV, &raw)?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.workers == 0 {
            return Err(EngineError::InvalidConfig("worker count must be at least 1".into()));
        }
        if self.iterations == 0 {
            return Err(EngineError::InvalidConfig(
                "benchmark needs at least one iteration".into(),
            ));
        }
        Ok(())
    }
}

fn parse_positive(name: &str, raw: &str) -> EngineResult<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| EngineError::InvalidConfig(format!("{name} must be a positive integer, got `{raw}`")))
}
