use anyhow::Result;

use crate::detect::result::{Confidence, DetectorOutput};
use crate::frame::{ChannelOrder, Frame};

/// Object detector.
///
/// A detector maps one frame to an annotated copy plus the labelled detections
/// that cleared `confidence`. The threshold is passed on every call; detectors
/// keep no per-call configuration state.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Channel order the detector expects its input in.
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }

    /// Run detection on a frame already converted to `channel_order()`.
    fn detect(&mut self, frame: &Frame, confidence: Confidence) -> Result<DetectorOutput>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
