use super::{KernelError, check_input};
use crate::core_modules::histogram::{BINS, Histogram};

const LANES: usize = 4;
const WORD: usize = 8;

#[inline(always)]
fn scatter_word(tables: &mut [[u32; BINS]; LANES], word: u64) {
    // Byte k of the word goes to sub-table k % 4, so two equal neighbouring
    // samples never increment the same counter back to back.
    tables[0][(word & 0xFF) as usize] += 1;
    tables[1][((word >> 8) & 0xFF) as usize] += 1;
    tables[2][((word >> 16) & 0xFF) as usize] += 1;
    tables[3][((word >> 24) & 0xFF) as usize] += 1;
    tables[0][((word >> 32) & 0xFF) as usize] += 1;
    tables[1][((word >> 40) & 0xFF) as usize] += 1;
    tables[2][((word >> 48) & 0xFF) as usize] += 1;
    tables[3][(word >> 56) as usize] += 1;
}

pub fn count_unrolled(pixels: &[u8]) -> Result<Histogram, KernelError> {
    check_input(pixels)?;

    let mut tables = [[0u32; BINS]; LANES];

    let mut words = pixels.chunks_exact(WORD);
    for chunk in &mut words {
        let mut raw = [0u8; WORD];
        raw.copy_from_slice(chunk);
        scatter_word(&mut tables, u64::from_le_bytes(raw));
    }
    for (index, &pixel) in words.remainder().iter().enumerate() {
        tables[index % LANES][pixel as usize] += 1;
    }

    let mut histogram = Histogram::new();
    let bins = histogram.bins_mut();
    for level in 0..BINS {
        bins[level] = tables[0][level] + tables[1][level] + tables[2][level] + tables[3][level];
    }
    Ok(histogram)
}
