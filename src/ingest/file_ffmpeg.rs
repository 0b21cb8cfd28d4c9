//! Local file frame source using FFmpeg.
//!
//! Frames are decoded in-memory and converted to packed BGR24, the layout
//! common video capture APIs deliver. Once the container runs out of packets
//! the decoder is flushed and the remaining frames are drained before the
//! source reports exhaustion.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::{FileConfig, FileStats};
use super::normalize::{frame_from_pixels, PixelFormat};
use crate::frame::{Frame, FrameSize};

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    input: Option<ffmpeg::format::context::Input>,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    size: FrameSize,
    frame_count: u64,
    flushed: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;
        let size = FrameSize::new(decoder.width(), decoder.height())
            .context("video track reports an empty frame size")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::BGR24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            config,
            input: Some(input),
            stream_index,
            decoder,
            scaler,
            size,
            frame_count: 0,
            flushed: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (ffmpeg, {})",
            self.config.path,
            self.size
        );
        Ok(())
    }

    pub(crate) fn native_size(&self) -> FrameSize {
        self.size
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert(&decoded).map(Some);
        }

        let Some(input) = self.input.as_mut() else {
            return Ok(None);
        };

        let mut received = false;
        for (stream, packet) in input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }

            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;

            if self.decoder.receive_frame(&mut decoded).is_ok() {
                received = true;
                break;
            }
        }
        if received {
            return self.convert(&decoded).map(Some);
        }

        if !self.flushed {
            self.flushed = true;
            self.decoder.send_eof().context("flush ffmpeg decoder")?;
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
        }

        Ok(None)
    }

    pub(crate) fn release(&mut self) {
        self.input = None;
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut bgr_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut bgr_frame)
            .context("scale frame to BGR")?;
        let (pixels, width, height) = frame_to_pixels(&bgr_frame)?;
        self.frame_count += 1;
        frame_from_pixels(pixels, width, height, PixelFormat::Bgr24)
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let pixels = pack_rows(
        frame.data(0),
        frame.stride(0),
        width as usize * 3,
        height as usize,
    )?;
    Ok((pixels, width, height))
}

/// Copy `height` rows of `row_bytes` out of a plane laid out with `stride`.
fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, height: usize) -> Result<Vec<u8>> {
    let total = row_bytes
        .checked_mul(height)
        .context("ffmpeg frame size overflows")?;
    if stride == row_bytes {
        return Ok(data
            .get(..total)
            .context("ffmpeg frame plane is shorter than width * height")?
            .to_vec());
    }

    let mut pixels = Vec::with_capacity(total);
    for row in 0..height {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_planes_are_bounds_checked() {
        let plane = vec![7u8; 6 * 2];
        assert_eq!(pack_rows(&plane, 6, 6, 2).unwrap(), plane);
        assert!(pack_rows(&plane, 6, 6, 3).is_err());
    }

    #[test]
    fn strided_rows_drop_padding() {
        let plane = [1u8, 2, 3, 0, 4, 5, 6, 0];
        assert_eq!(pack_rows(&plane, 4, 3, 2).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert!(pack_rows(&plane[..6], 4, 3, 2).is_err());
    }
}
