//! Single-image inference and sample selection.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::detect::{Confidence, Detector, DetectorOutput};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decode an image file and run the detector on it once.
pub fn infer_image(
    detector: &mut dyn Detector,
    path: &Path,
    confidence: Confidence,
) -> Result<DetectorOutput> {
    let image =
        image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    let frame = Frame::from_image(image)?.to_order(detector.channel_order());
    detector
        .detect(&frame, confidence)
        .with_context(|| format!("detector '{}' failed on {}", detector.name(), path.display()))
}

/// Image files in `dir`, sorted by path.
pub fn list_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list sample directory {}", dir.display()))?;
    let mut samples = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if path.is_file() && is_image {
            samples.push(path);
        }
    }
    samples.sort();
    Ok(samples)
}

/// Pick the `index`-th sample (1-based) from `dir`.
pub fn select_sample(dir: &Path, index: usize) -> Result<PathBuf> {
    let samples = list_samples(dir)?;
    if samples.is_empty() {
        return Err(anyhow!("no sample images in {}", dir.display()));
    }
    if index == 0 || index > samples.len() {
        return Err(anyhow!(
            "invalid image selection {}: choose 1..={}",
            index,
            samples.len()
        ));
    }
    Ok(samples[index - 1].clone())
}
