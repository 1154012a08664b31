// THEORY:
// Counting kernels are leaf functions: a slice of 8-bit samples in, a 256-bin
// frequency table out. Two implementations exist and must agree bin for bin on
// every input, so the engine can treat them as interchangeable strategies and
// the benchmark harness can compare their cost in isolation.
//
// - `scalar`: the portable one-sample-per-iteration loop.
// - `unrolled`: hand-written low-level variant; loads eight samples per word,
//   scatters them into four interleaved sub-tables to break the store-to-load
//   dependency on repeated levels, then folds the sub-tables together.
//
// Both reject empty input and input larger than `MAX_PIXELS`.

mod scalar;
mod unrolled;

use crate::core_modules::histogram::{Histogram, MAX_PIXELS};
use std::fmt;
use std::str::FromStr;

pub use scalar::count_scalar;
pub use unrolled::count_unrolled;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("counting kernel received zero pixels")]
    EmptyInput,

    #[error("counting kernel received {0} pixels, limit is {limit}", limit = MAX_PIXELS)]
    TooManyPixels(usize),
}

/// Signature shared by every counting kernel.
pub type CountingKernel = fn(&[u8]) -> Result<Histogram, KernelError>;

#[inline(always)]
pub(crate) fn check_input(pixels: &[u8]) -> Result<(), KernelError> {
    if pixels.is_empty() {
        return Err(KernelError::EmptyInput);
    }
    if pixels.len() > MAX_PIXELS {
        return Err(KernelError::TooManyPixels(pixels.len()));
    }
    Ok(())
}

/// Which counting kernel a computation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Strategy {
    /// kernel-A
    #[default]
    Scalar,
    /// kernel-B
    Unrolled,
}

impl Strategy {
    /// Benchmark order.
    pub const ALL: [Strategy; 2] = [Strategy::Scalar, Strategy::Unrolled];

    pub fn kernel(self) -> CountingKernel {
        match self {
            Strategy::Scalar => count_scalar,
            Strategy::Unrolled => count_unrolled,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Scalar => "scalar",
            Strategy::Unrolled => "unrolled",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy `{0}` (expected `scalar` or `unrolled`)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scalar" | "cpp" | "a" => Ok(Strategy::Scalar),
            "unrolled" | "asm" | "b" => Ok(Strategy::Unrolled),
            _ => Err(ParseStrategyError(raw.to_string())),
        }
    }
}
