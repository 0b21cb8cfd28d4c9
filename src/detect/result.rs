use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fmt;

use crate::frame::Frame;

/// Slider default in the web demo this crate grew out of.
pub const DEFAULT_CONFIDENCE: f32 = 0.45;

/// Lowest threshold `Confidence::clamped` will produce.
pub const MIN_CONFIDENCE: f32 = 0.01;

/// Detection confidence threshold in `(0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
pub struct Confidence(f32);

impl Confidence {
    pub fn new(value: f32) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(anyhow!(
                "confidence must be in (0, 1], got {}",
                value
            ));
        }
        Ok(Self(value))
    }

    /// Clamp an arbitrary value into the accepted range. NaN maps to the default.
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(MIN_CONFIDENCE, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn admits(self, score: f32) -> bool {
        score >= self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Axis-aligned box in normalized (0..1) frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.w).min(other.x + other.w);
        let bottom = (self.y + self.h).min(other.y + other.h);
        let inter = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One labelled detection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    /// Present when the backend localizes objects; used for drawing only.
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Everything a detector hands back for one frame.
#[derive(Clone, Debug)]
pub struct DetectorOutput {
    pub annotated: Frame,
    pub detections: Vec<Detection>,
}
