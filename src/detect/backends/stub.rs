use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::annotate::draw_detections;
use crate::detect::backend::Detector;
use crate::detect::classes::COCO_CLASSES;
use crate::detect::result::{BoundingBox, Confidence, Detection, DetectorOutput};
use crate::frame::Frame;

/// Classes the stub backend draws from.
const STUB_CLASSES: [usize; 6] = [0, 2, 15, 16, 39, 56]; // person, car, cat, dog, bottle, chair

const MAX_STUB_DETECTIONS: usize = 3;

/// Stub backend for demos and tests. No model file.
///
/// Hashes the frame pixels and derives up to three detections from the digest, so
/// identical frames always yield identical detections.
#[derive(Default)]
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame, confidence: Confidence) -> Result<DetectorOutput> {
        let digest: [u8; 32] = Sha256::digest(frame.pixels()).into();

        let count = digest[0] as usize % (MAX_STUB_DETECTIONS + 1);
        let detections: Vec<Detection> = (0..count)
            .map(|k| {
                let class = STUB_CLASSES[digest[1 + k] as usize % STUB_CLASSES.len()];
                let score = 0.3 + (digest[4 + k] as f32 / 255.0) * 0.7;
                let b = &digest[8 + k * 4..12 + k * 4];
                let w = 0.1 + b[2] as f32 / 255.0 * 0.4;
                let h = 0.1 + b[3] as f32 / 255.0 * 0.4;
                let bbox = BoundingBox {
                    x: b[0] as f32 / 255.0 * (1.0 - w),
                    y: b[1] as f32 / 255.0 * (1.0 - h),
                    w,
                    h,
                };
                Detection::new(COCO_CLASSES[class], score).with_bbox(bbox)
            })
            .filter(|det| confidence.admits(det.confidence))
            .collect();

        Ok(DetectorOutput {
            annotated: draw_detections(frame, &detections),
            detections,
        })
    }
}
