// THEORY:
// The channel extractor turns a decoded image into one contiguous byte plane per
// channel. Every plane has exactly width * height samples, and planes are shared
// as `Arc<[u8]>` so partition tasks on the worker pool can read their sub-slice
// without copying and without borrowing from the caller's stack.
//
// Images are flattened to 8-bit RGB first; alpha carries no intensity and is
// dropped. Luminance is Rec. 601 luma computed in integer arithmetic:
// (299 R + 587 G + 114 B + 500) / 1000.

use crate::core_modules::histogram::{Channel, MAX_PIXELS};
use crate::error::{EngineError, EngineResult};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

/// Immutable samples of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer(Arc<[u8]>);

impl PixelBuffer {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for PixelBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PixelBuffer {
    fn from(samples: Vec<u8>) -> Self {
        Self(Arc::from(samples))
    }
}

#[inline(always)]
pub fn luminance(red: u8, green: u8, blue: u8) -> u8 {
    ((299 * red as u32 + 587 * green as u32 + 114 * blue as u32 + 500) / 1000) as u8
}

/// The per-channel planes of one image, all of the same length.
#[derive(Debug, Clone)]
pub struct ChannelBuffers {
    width: u32,
    height: u32,
    buffers: BTreeMap<Channel, PixelBuffer>,
}

impl ChannelBuffers {
    /// Assembles planes that were extracted elsewhere. Every plane must hold
    /// exactly `width * height` samples.
    pub fn new(
        width: u32,
        height: u32,
        buffers: impl IntoIterator<Item = (Channel, PixelBuffer)>,
    ) -> EngineResult<Self> {
        let expected = pixel_count(width, height)?;
        let buffers: BTreeMap<Channel, PixelBuffer> = buffers.into_iter().collect();
        for (channel, buffer) in &buffers {
            if buffer.len() != expected {
                return Err(EngineError::InvalidInput(format!(
                    "{channel} channel holds {} samples, expected {expected} ({width} x {height})",
                    buffer.len()
                )));
            }
        }
        Ok(Self {
            width,
            height,
            buffers,
        })
    }

    /// A single anonymous plane, treated as luminance. Useful for raw
    /// grayscale data that never went through an image decoder.
    pub fn single(buffer: impl Into<PixelBuffer>) -> EngineResult<Self> {
        let buffer = buffer.into();
        let width = u32::try_from(buffer.len()).map_err(|_| {
            EngineError::InvalidInput(format!("{} samples exceed a single row", buffer.len()))
        })?;
        let height = if width == 0 { 0 } else { 1 };
        Self::new(width, height, [(Channel::Luminance, buffer)])
    }

    /// Splits a tightly packed RGBA8 buffer into red, green, blue and luminance.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> EngineResult<Self> {
        let pixels = pixel_count(width, height)?;
        if rgba.len() != pixels * 4 {
            return Err(EngineError::InvalidInput(format!(
                "RGBA buffer holds {} bytes, expected {} ({width} x {height} x 4)",
                rgba.len(),
                pixels * 4
            )));
        }
        Ok(Self::from_pixels(width, height, pixels, rgba.chunks_exact(4)))
    }

    pub fn from_image(image: &DynamicImage) -> EngineResult<Self> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = pixel_count(width, height)?;
        Ok(Self::from_pixels(
            width,
            height,
            pixels,
            rgb.as_raw().chunks_exact(3),
        ))
    }

    fn from_pixels<'a>(
        width: u32,
        height: u32,
        pixels: usize,
        samples: impl Iterator<Item = &'a [u8]>,
    ) -> Self {
        let mut red = Vec::with_capacity(pixels);
        let mut green = Vec::with_capacity(pixels);
        let mut blue = Vec::with_capacity(pixels);
        let mut luma = Vec::with_capacity(pixels);

        for pixel in samples {
            red.push(pixel[0]);
            green.push(pixel[1]);
            blue.push(pixel[2]);
            luma.push(luminance(pixel[0], pixel[1], pixel[2]));
        }

        let buffers = BTreeMap::from([
            (Channel::Red, PixelBuffer::from(red)),
            (Channel::Green, PixelBuffer::from(green)),
            (Channel::Blue, PixelBuffer::from(blue)),
            (Channel::Luminance, PixelBuffer::from(luma)),
        ]);
        Self {
            width,
            height,
            buffers,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per channel.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn get(&self, channel: Channel) -> Option<&PixelBuffer> {
        self.buffers.get(&channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &PixelBuffer)> {
        self.buffers.iter().map(|(channel, buffer)| (*channel, buffer))
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.buffers.keys().copied()
    }
}

fn pixel_count(width: u32, height: u32) -> EngineResult<usize> {
    let pixels = width as usize * height as usize;
    if pixels > MAX_PIXELS {
        return Err(EngineError::InvalidInput(format!(
            "{width} x {height} image has {pixels} pixels, limit is {MAX_PIXELS}"
        )));
    }
    Ok(pixels)
}

/// Decodes the image at `path` and extracts its channels.
pub fn load_channels(path: impl AsRef<Path>) -> EngineResult<ChannelBuffers> {
    let image = image::open(path.as_ref())?;
    ChannelBuffers::from_image(&image)
}
