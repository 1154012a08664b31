use super::{KernelError, check_input};
use crate::core_modules::histogram::Histogram;

pub fn count_scalar(pixels: &[u8]) -> Result<Histogram, KernelError> {
    check_input(pixels)?;

    let mut histogram = Histogram::new();
    let bins = histogram.bins_mut();
    for &pixel in pixels {
        bins[pixel as usize] += 1;
    }
    Ok(histogram)
}
