//! Object detection over video streams and images.
//!
//! The core is the stream session loop: read a frame, resize and color-convert
//! it, run a detector with an explicit confidence threshold, accumulate the
//! distinct labels seen, and report instantaneous FPS to a presenter.
//!
//! # Module Structure
//!
//! - `frame`: Frame container, resize and channel-order conversion
//! - `detect`: Detector trait, result types, backends (stub, tract) and registry
//! - `ingest`: Video sources (stub://, in-memory, local files via ffmpeg)
//! - `session`: The per-frame loop, cancellation and presenter interface
//! - `labels`, `fps`: Loop state (unique label set, FPS meter)
//! - `image_input`: Single-image inference and sample selection
//! - `config`, `ui`, `cli`: Configuration, terminal presentation, command line

pub mod cli;
pub mod config;
pub mod detect;
pub mod fps;
pub mod frame;
pub mod image_input;
pub mod ingest;
pub mod labels;
pub mod session;
pub mod ui;

pub use config::{AppConfig, ConfigOverrides, DetectorSettings, FrameSettings};
pub use detect::{
    BackendRegistry, BoundingBox, Confidence, Detection, Detector, DetectorOutput, StubBackend,
};
pub use fps::FpsMeter;
pub use frame::{ChannelOrder, Frame, FrameSize};
pub use image_input::{infer_image, list_samples, select_sample};
pub use ingest::{open_source, FileConfig, FileSource, FrameSequence, VideoSource};
pub use labels::UniqueLabelSet;
pub use session::{
    CancelToken, FrameUpdate, Presenter, SessionConfig, SessionEnd, SessionSummary, StreamSession,
};
