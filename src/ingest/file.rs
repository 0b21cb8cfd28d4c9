//! Local file frame source.
//!
//! This module provides `FileSource` for reading frames from local video files.
//! The file source is responsible for:
//! - Decoding video frames in-memory (no network access)
//! - Declaring the native frame size when opened
//! - Reporting exhaustion as `None` rather than an error
//!
//! Paths of the form `stub://name?frames=N&width=W&height=H` produce a
//! synthetic BGR stream instead, without touching the filesystem.

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::normalize::{frame_from_pixels, PixelFormat};
use super::VideoSource;
use crate::frame::{Frame, FrameSize};

const STUB_SCHEME: &str = "stub://";
const DEFAULT_STUB_FRAMES: u64 = 30;
const DEFAULT_STUB_WIDTH: u32 = 640;
const DEFAULT_STUB_HEIGHT: u32 = 480;

/// Configuration for a local file source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local file path (e.g., "data/sample_videos/sample.mp4") or a `stub://` URL.
    pub path: String,
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes): {}",
                config.path
            ));
        }
        if config.path.starts_with(STUB_SCHEME) {
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "video file decoding requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    /// Connect to the file source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

impl VideoSource for FileSource {
    fn native_size(&self) -> FrameSize {
        match &self.backend {
            FileBackend::Synthetic(source) => source.size,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.native_size(),
        }
    }

    fn read_next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    fn release(&mut self) {
        let stats = self.stats();
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.release(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.release(),
        }
        log::info!(
            "FileSource: released {} after {} frames",
            stats.path,
            stats.frames_captured
        );
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for demos and tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    size: FrameSize,
    total_frames: u64,
    frame_count: u64,
    scene_state: u8,
    released: bool,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        let (total_frames, size) = parse_stub_params(&config.path)?;
        Ok(Self {
            config,
            size,
            total_frames,
            frame_count: 0,
            scene_state: 0,
            released: false,
        })
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (synthetic, {} frames at {})",
            self.config.path,
            self.total_frames,
            self.size
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.released || self.frame_count >= self.total_frames {
            return Ok(None);
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels()?;
        frame_from_pixels(pixels, self.size.width, self.size.height, PixelFormat::Bgr24).map(Some)
    }

    fn generate_synthetic_pixels(&mut self) -> Result<Vec<u8>> {
        let pixel_count = self.size.byte_len()?;
        if self.frame_count % 10 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        Ok(pixels)
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

fn parse_stub_params(path: &str) -> Result<(u64, FrameSize)> {
    let mut frames = DEFAULT_STUB_FRAMES;
    let mut width = DEFAULT_STUB_WIDTH;
    let mut height = DEFAULT_STUB_HEIGHT;

    let rest = path.trim_start_matches(STUB_SCHEME);
    if let Some((_, query)) = rest.split_once('?') {
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub parameter '{}' in {}", pair, path))?;
            match key {
                "frames" => {
                    frames = value
                        .parse()
                        .map_err(|_| anyhow!("stub frames must be an integer, got '{}'", value))?
                }
                "width" => {
                    width = value
                        .parse()
                        .map_err(|_| anyhow!("stub width must be an integer, got '{}'", value))?
                }
                "height" => {
                    height = value
                        .parse()
                        .map_err(|_| anyhow!("stub height must be an integer, got '{}'", value))?
                }
                other => return Err(anyhow!("unknown stub parameter '{}' in {}", other, path)),
            }
        }
    }

    Ok((frames, FrameSize::new(width, height)?))
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}
