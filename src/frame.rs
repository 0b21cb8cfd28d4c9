//! Frame container and the per-frame transforms the loop applies.
//!
//! - `Frame`: packed 8-bit, 3-channel pixel buffer with dimensions and channel order.
//! - `FrameSize`: non-zero width/height pair.
//! - `ChannelOrder`: RGB or BGR interleaving.
//!
//! Frames are produced by a source, transformed (resize, channel swap), handed to a
//! detector and dropped. Transforms return new frames; the input is never mutated.

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Bytes per pixel for every frame handled by this crate.
pub const CHANNELS: usize = 3;

/// Channel interleaving of a packed 3-channel frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Frame dimensions in pixels. Both sides are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "frame size must be non-zero, got {}x{}",
                width,
                height
            ));
        }
        Ok(Self { width, height })
    }

    /// Byte length of a packed frame of this size.
    pub fn byte_len(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One still image pulled from a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pixels: Vec<u8>,
    size: FrameSize,
    order: ChannelOrder,
}

impl Frame {
    /// Wrap a packed pixel buffer. The length must be exactly `width * height * 3`.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, order: ChannelOrder) -> Result<Self> {
        let size = FrameSize::new(width, height)?;
        let expected = size.byte_len()?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            size,
            order,
        })
    }

    /// A frame with every pixel set to `color` (given in the frame's own order).
    pub fn filled(size: FrameSize, order: ChannelOrder, color: [u8; 3]) -> Result<Self> {
        let len = size.byte_len()?;
        let pixels = color.iter().copied().cycle().take(len).collect();
        Self::new(pixels, size.width, size.height, order)
    }

    pub fn from_rgb_image(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, ChannelOrder::Rgb)
    }

    pub fn from_image(image: DynamicImage) -> Result<Self> {
        Self::from_rgb_image(image.to_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Nearest-neighbour resample to `target`. A frame already at `target` is
    /// returned unchanged.
    pub fn resize(&self, target: FrameSize) -> Result<Frame> {
        if target == self.size {
            return Ok(self.clone());
        }
        let view: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(self.size.width, self.size.height, self.pixels.as_slice())
                .ok_or_else(|| anyhow!("frame buffer does not match {}", self.size))?;
        let resized = imageops::resize(&view, target.width, target.height, FilterType::Nearest);
        Frame::new(resized.into_raw(), target.width, target.height, self.order)
    }

    /// Reinterleave into `order`, swapping the first and third channel when needed.
    pub fn to_order(&self, order: ChannelOrder) -> Frame {
        if order == self.order {
            return self.clone();
        }
        let mut pixels = self.pixels.clone();
        for px in pixels.chunks_exact_mut(CHANNELS) {
            px.swap(0, 2);
        }
        Frame {
            pixels,
            size: self.size,
            order,
        }
    }

    /// Copy into an `image` RGB buffer regardless of the stored order.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let rgb = self.to_order(ChannelOrder::Rgb);
        RgbImage::from_raw(rgb.size.width, rgb.size.height, rgb.pixels)
            .ok_or_else(|| anyhow!("frame buffer does not match {}", self.size))
    }

    /// Encode to disk; format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_rgb_image()?
            .save(path)
            .with_context(|| format!("failed to write frame to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, (x + y) as u8]);
            }
        }
        Frame::new(pixels, width, height, ChannelOrder::Bgr).unwrap()
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(Frame::new(vec![0u8; 11], 2, 2, ChannelOrder::Rgb).is_err());
        assert!(Frame::new(vec![], 0, 2, ChannelOrder::Rgb).is_err());
    }

    #[test]
    fn resize_to_same_size_is_identity() -> Result<()> {
        let frame = gradient(7, 5);
        let resized = frame.resize(frame.size())?;
        assert_eq!(resized, frame);
        Ok(())
    }

    #[test]
    fn resize_changes_dimensions_and_keeps_order() -> Result<()> {
        let frame = gradient(8, 6);
        let resized = frame.resize(FrameSize::new(4, 3)?)?;
        assert_eq!(resized.width(), 4);
        assert_eq!(resized.height(), 3);
        assert_eq!(resized.order(), ChannelOrder::Bgr);
        assert_eq!(resized.pixels().len(), 4 * 3 * 3);
        Ok(())
    }

    #[test]
    fn nearest_upscale_replicates_pixels() -> Result<()> {
        let frame = Frame::filled(FrameSize::new(1, 1)?, ChannelOrder::Rgb, [10, 20, 30])?;
        let resized = frame.resize(FrameSize::new(3, 2)?)?;
        for px in resized.pixels().chunks_exact(CHANNELS) {
            assert_eq!(px, &[10, 20, 30]);
        }
        Ok(())
    }

    #[test]
    fn channel_swap_round_trips() {
        let frame = gradient(3, 2);
        let rgb = frame.to_order(ChannelOrder::Rgb);
        assert_eq!(rgb.order(), ChannelOrder::Rgb);
        assert_eq!(&rgb.pixels()[..3], &[0, 0, 0]);
        assert_eq!(&rgb.pixels()[3..6], &[1, 0, 1]);
        assert_eq!(rgb.to_order(ChannelOrder::Bgr), frame);
    }

    #[test]
    fn same_order_conversion_is_identity() {
        let frame = gradient(2, 2);
        assert_eq!(frame.to_order(ChannelOrder::Bgr), frame);
    }

    #[test]
    fn rgb_image_conversion_uses_rgb_order() -> Result<()> {
        let frame = Frame::filled(FrameSize::new(2, 1)?, ChannelOrder::Bgr, [1, 2, 3])?;
        let image = frame.to_rgb_image()?;
        assert_eq!(image.get_pixel(1, 0).0, [3, 2, 1]);
        let back = Frame::from_rgb_image(image)?;
        assert_eq!(back.order(), ChannelOrder::Rgb);
        assert_eq!(back.to_order(ChannelOrder::Bgr), frame);
        Ok(())
    }
}
