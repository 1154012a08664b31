// THEORY:
// Static range partitioning. A buffer of `length` samples is split into ordered,
// contiguous, non-overlapping half-open ranges whose union is `[0, length)`.
// Sizes differ by at most one sample: the first `length % workers` partitions
// take the extra element. Never more partitions than samples, so no worker is
// ever handed an empty range.

use std::num::NonZeroUsize;
use std::ops::Range;

/// A half-open index range `[start, end)` into a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

pub fn partition(length: usize, workers: NonZeroUsize) -> Vec<Partition> {
    if length == 0 {
        return Vec::new();
    }

    let count = workers.get().min(length);
    let base = length / count;
    let extra = length % count;

    let mut partitions = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        let size = if index < extra { base + 1 } else { base };
        partitions.push(Partition {
            start,
            end: start + size,
        });
        start += size;
    }
    partitions
}
