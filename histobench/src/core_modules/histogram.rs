// THEORY:
// A `Histogram` is the smallest result unit of the engine: 256 counters, one per
// 8-bit intensity level. Partial histograms are produced by counting kernels for
// one partition each and are thrown away once merged; a `HistogramBundle` holds
// the final, merged histogram of every channel for one request.
//
// Counters are `u32`. Every buffer is capped at `MAX_PIXELS` (2^30) samples, so
// no bin can overflow even when all samples land in it.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

pub const BINS: usize = 256;

/// Largest number of samples a single channel may hold.
pub const MAX_PIXELS: usize = 1 << 30;

/// One scalar intensity plane derived from an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Channel {
    Red,
    Green,
    Blue,
    Luminance,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Red,
        Channel::Green,
        Channel::Blue,
        Channel::Luminance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
            Channel::Luminance => "luminance",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Frequency table of 8-bit samples.
#[derive(Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u32; BINS],
}

impl Histogram {
    /// An all-zero histogram.
    pub const fn new() -> Self {
        Self { bins: [0; BINS] }
    }

    pub fn from_bins(bins: [u32; BINS]) -> Self {
        Self { bins }
    }

    pub fn bins(&self) -> &[u32; BINS] {
        &self.bins
    }

    #[inline(always)]
    pub(crate) fn bins_mut(&mut self) -> &mut [u32; BINS] {
        &mut self.bins
    }

    /// Number of samples counted, i.e. the sum over all bins.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&count| count as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.iter().all(|&count| count == 0)
    }

    /// Element-wise sum of `other` into `self`.
    pub fn merge(&mut self, other: &Histogram) {
        for (bin, count) in self.bins.iter_mut().zip(other.bins.iter()) {
            *bin += *count;
        }
    }

    /// Intensity level with the highest count. Ties go to the lower level.
    pub fn peak(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let mut best = 0usize;
        for level in 1..BINS {
            if self.bins[level] > self.bins[best] {
                best = level;
            }
        }
        Some(best as u8)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<u8> for Histogram {
    type Output = u32;

    fn index(&self, level: u8) -> &u32 {
        &self.bins[level as usize]
    }
}

impl fmt::Debug for Histogram {
    // Only non-empty bins; 256 zeros are unreadable in assertion output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.bins
                    .iter()
                    .enumerate()
                    .filter(|(_, count)| **count != 0),
            )
            .finish()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Histogram {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.bins.iter())
    }
}

/// The final merged histogram of every channel for one computation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HistogramBundle {
    histograms: BTreeMap<Channel, Histogram>,
}

impl HistogramBundle {
    pub fn get(&self, channel: Channel) -> Option<&Histogram> {
        self.histograms.get(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.histograms.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &Histogram)> {
        self.histograms.iter().map(|(channel, histogram)| (*channel, histogram))
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

impl From<BTreeMap<Channel, Histogram>> for HistogramBundle {
    fn from(histograms: BTreeMap<Channel, Histogram>) -> Self {
        Self { histograms }
    }
}
