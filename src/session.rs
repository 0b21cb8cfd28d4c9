//! Stream session: the per-frame inference loop.
//!
//! A session owns one video source, a target frame size, a confidence threshold
//! and the set of labels seen so far. `run` drives the loop:
//!
//! 1. check the cancel token
//! 2. read a frame (end of stream or a failed read ends the loop)
//! 3. resize to the target size and convert to the detector's channel order
//! 4. detect with the session threshold
//! 5. merge labels, measure FPS, hand the update to the presenter
//!
//! The source is released exactly once however the loop ends.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::detect::{Confidence, Detection, Detector};
use crate::fps::FpsMeter;
use crate::frame::{Frame, FrameSize};
use crate::ingest::VideoSource;
use crate::labels::UniqueLabelSet;

/// Parameters fixed for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub target: FrameSize,
    pub confidence: Confidence,
}

/// Cooperative cancellation flag, checked once per iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-frame payload for the presenter.
#[derive(Debug)]
pub struct FrameUpdate<'a> {
    pub annotated: &'a Frame,
    pub detections: &'a [Detection],
    pub height: u32,
    pub width: u32,
    pub fps: f64,
    /// 1-based index of the processed frame.
    pub frame_index: u64,
}

/// Receives loop output.
pub trait Presenter {
    fn frame(&mut self, update: &FrameUpdate<'_>) -> Result<()>;

    /// Called once after the source is released, with labels in ascending order.
    fn finish(&mut self, labels: &[String]) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    EndOfStream,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub labels: Vec<String>,
    pub end: SessionEnd,
}

/// Source handle that releases at most once, on demand or on drop.
struct SourceHandle<S: VideoSource> {
    source: S,
    released: bool,
}

impl<S: VideoSource> SourceHandle<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        if self.released {
            return Ok(None);
        }
        self.source.read_next_frame()
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }
}

impl<S: VideoSource> Drop for SourceHandle<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// One video stream, from open to exhaustion or cancellation.
pub struct StreamSession<S: VideoSource> {
    source: SourceHandle<S>,
    config: SessionConfig,
    labels: UniqueLabelSet,
    fps: FpsMeter,
}

impl<S: VideoSource> StreamSession<S> {
    pub fn open(source: S, config: SessionConfig) -> Self {
        log::debug!(
            "session opened: native {} -> target {}, confidence {}",
            source.native_size(),
            config.target,
            config.confidence
        );
        Self {
            source: SourceHandle::new(source),
            config,
            labels: UniqueLabelSet::new(),
            fps: FpsMeter::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn native_size(&self) -> FrameSize {
        self.source.source.native_size()
    }

    pub fn labels(&self) -> &UniqueLabelSet {
        &self.labels
    }

    /// Drive the loop to completion.
    ///
    /// Detector and presenter errors abort the loop and are returned after the
    /// source has been released; the presenter's `finish` is not called then.
    pub fn run(
        mut self,
        detector: &mut dyn Detector,
        presenter: &mut dyn Presenter,
        cancel: &CancelToken,
    ) -> Result<SessionSummary> {
        let outcome = self.drive(detector, presenter, cancel);
        self.source.release();
        let (end, frames_processed) = outcome?;

        let labels = self.labels.to_vec();
        log::info!(
            "session ended ({:?}) after {} frames; {} unique labels",
            end,
            frames_processed,
            labels.len()
        );
        presenter.finish(&labels)?;

        Ok(SessionSummary {
            frames_processed,
            labels,
            end,
        })
    }

    fn drive(
        &mut self,
        detector: &mut dyn Detector,
        presenter: &mut dyn Presenter,
        cancel: &CancelToken,
    ) -> Result<(SessionEnd, u64)> {
        let mut frames = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Ok((SessionEnd::Cancelled, frames));
            }

            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok((SessionEnd::EndOfStream, frames)),
                Err(err) => {
                    log::warn!("can't read frame, treating as end of stream: {:#}", err);
                    return Ok((SessionEnd::EndOfStream, frames));
                }
            };

            let prepared = frame
                .resize(self.config.target)?
                .to_order(detector.channel_order());
            drop(frame);

            let output = detector
                .detect(&prepared, self.config.confidence)
                .with_context(|| {
                    format!("detector '{}' failed on frame {}", detector.name(), frames + 1)
                })?;
            let fps = self.fps.tick();
            let added = self.labels.merge(&output.detections);
            frames += 1;

            log::debug!(
                "frame {}: {} detections ({} new labels), {:.2} fps",
                frames,
                output.detections.len(),
                added,
                fps
            );

            presenter.frame(&FrameUpdate {
                annotated: &output.annotated,
                detections: &output.detections,
                height: self.config.target.height,
                width: self.config.target.width,
                fps,
                frame_index: frames,
            })?;
        }
    }
}
