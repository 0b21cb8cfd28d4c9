use std::collections::VecDeque;

use anyhow::Result;

use super::VideoSource;
use crate::frame::{Frame, FrameSize};

/// In-memory frame queue.
pub struct FrameSequence {
    frames: VecDeque<Frame>,
    native: FrameSize,
    released: bool,
}

impl FrameSequence {
    pub fn new(native: FrameSize, frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            native,
            released: false,
        }
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl VideoSource for FrameSequence {
    fn native_size(&self) -> FrameSize {
        self.native
    }

    fn read_next_frame(&mut self) -> Result<Option<Frame>> {
        if self.released {
            return Ok(None);
        }
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ChannelOrder;

    #[test]
    fn yields_frames_in_order_then_none() -> Result<()> {
        let size = FrameSize::new(2, 2)?;
        let frames = vec![
            Frame::filled(size, ChannelOrder::Bgr, [1, 1, 1])?,
            Frame::filled(size, ChannelOrder::Bgr, [2, 2, 2])?,
        ];
        let mut source = FrameSequence::new(size, frames);
        assert_eq!(source.read_next_frame()?.unwrap().pixels()[0], 1);
        assert_eq!(source.read_next_frame()?.unwrap().pixels()[0], 2);
        assert!(source.read_next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn release_drops_pending_frames() -> Result<()> {
        let size = FrameSize::new(1, 1)?;
        let mut source =
            FrameSequence::new(size, vec![Frame::filled(size, ChannelOrder::Rgb, [0, 0, 0])?]);
        source.release();
        assert!(source.is_released());
        assert_eq!(source.remaining(), 0);
        assert!(source.read_next_frame()?.is_none());
        Ok(())
    }
}
