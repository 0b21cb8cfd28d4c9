use anyhow::Result;

use crate::frame::{ChannelOrder, Frame};

/// Packed pixel layouts decoders hand us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
}

impl PixelFormat {
    fn order(self) -> ChannelOrder {
        match self {
            PixelFormat::Rgb24 => ChannelOrder::Rgb,
            PixelFormat::Bgr24 => ChannelOrder::Bgr,
        }
    }
}

/// Wrap decoder output as a `Frame`, keeping its channel order.
pub fn frame_from_pixels(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Frame> {
    Frame::new(pixels, width, height, format.order())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_pass_through_keeps_order() -> Result<()> {
        let pixels = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let frame = frame_from_pixels(pixels.clone(), 1, 3, PixelFormat::Bgr24)?;
        assert_eq!(frame.order(), ChannelOrder::Bgr);
        assert_eq!(frame.pixels(), &pixels[..]);
        Ok(())
    }

    #[test]
    fn short_buffers_are_rejected_for_odd_sizes() {
        assert!(frame_from_pixels(vec![128u8; 13], 3, 3, PixelFormat::Rgb24).is_err());
        assert!(frame_from_pixels(vec![0u8; 8], 1, 3, PixelFormat::Bgr24).is_err());
        assert!(frame_from_pixels(vec![0u8; 0], 0, 3, PixelFormat::Rgb24).is_err());
    }
}
