//! Video sources.
//!
//! This module provides the sources a stream session can read from:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` streams (demos and tests)
//! - In-memory frame sequences
//!
//! Every source declares its native frame size when opened, yields frames one
//! at a time until exhausted, and is released exactly once by its session.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod memory;
pub mod normalize;

use anyhow::Result;

use crate::frame::{Frame, FrameSize};

pub use file::{FileConfig, FileSource};
pub use memory::FrameSequence;
pub use normalize::{frame_from_pixels, PixelFormat};

/// A readable stream of frames.
pub trait VideoSource {
    /// Frame size the source was opened with.
    fn native_size(&self) -> FrameSize;

    /// Next frame, or `None` once the stream is exhausted.
    ///
    /// An `Err` is a failed read; callers treat it as the end of the stream.
    fn read_next_frame(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying handle. Further reads return `None`.
    fn release(&mut self);
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn native_size(&self) -> FrameSize {
        (**self).native_size()
    }

    fn read_next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).read_next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Open a file or `stub://` source and connect it.
pub fn open_source(path: &str) -> Result<Box<dyn VideoSource>> {
    let mut source = FileSource::new(FileConfig {
        path: path.to_string(),
    })?;
    source.connect()?;
    Ok(Box::new(source))
}
