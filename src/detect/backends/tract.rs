#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::tract_ndarray::{ArrayView3, Ix3};
use tract_onnx::prelude::*;

use crate::detect::annotate::draw_detections;
use crate::detect::backend::Detector;
use crate::detect::classes::ClassNames;
use crate::detect::nms::{non_max_suppression, DEFAULT_IOU_THRESHOLD};
use crate::detect::result::{BoundingBox, Confidence, Detection, DetectorOutput};
use crate::frame::{Frame, FrameSize};

/// Columns ahead of the per-class scores in a YOLOv5 output row.
const ROW_PREFIX: usize = 5;

/// Tract-based backend for YOLO-style ONNX models.
///
/// The model is loaded once from a local file with a fixed `1x3xHxW` input.
/// Frames are resampled to the model input; boxes are reported in normalized
/// coordinates so they map back onto the caller's frame unchanged.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input: FrameSize,
    classes: ClassNames,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input: FrameSize) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input.height as usize, input.width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "TractBackend: loaded {} (input {})",
            model_path.display(),
            input
        );

        Ok(Self {
            model,
            input,
            classes: ClassNames::default(),
        })
    }

    /// Replace the default COCO class names.
    pub fn with_classes(mut self, classes: ClassNames) -> Self {
        log::info!("TractBackend: using {} class names", classes.len());
        self.classes = classes;
        self
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let resized = frame.resize(self.input)?;
        let pixels = resized.pixels();
        let width = self.input.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }
}

/// Turn YOLOv5 rows `[cx, cy, w, h, objectness, class scores...]` in model
/// input pixels into thresholded, normalized, NMS-filtered detections.
pub(crate) fn decode_rows(
    rows: ArrayView3<f32>,
    input: FrameSize,
    classes: &ClassNames,
    confidence: Confidence,
) -> Result<Vec<Detection>> {
    let (_, count, cols) = rows.dim();
    if cols <= ROW_PREFIX {
        return Err(anyhow!(
            "model output rows have {} columns, expected more than {}",
            cols,
            ROW_PREFIX
        ));
    }

    let in_w = input.width as f32;
    let in_h = input.height as f32;
    let mut detections = Vec::new();
    for i in 0..count {
        let objectness = rows[[0, i, 4]];
        if !confidence.admits(objectness) {
            continue;
        }
        let (class, class_score) = (ROW_PREFIX..cols)
            .map(|c| (c - ROW_PREFIX, rows[[0, i, c]]))
            .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        let score = objectness * class_score;
        if !score.is_finite() || !confidence.admits(score) {
            continue;
        }

        let (cx, cy, w, h) = (rows[[0, i, 0]], rows[[0, i, 1]], rows[[0, i, 2]], rows[[0, i, 3]]);
        let bbox = BoundingBox {
            x: (cx - w / 2.0) / in_w,
            y: (cy - h / 2.0) / in_h,
            w: w / in_w,
            h: h / in_h,
        };
        detections.push(Detection::new(classes.name(class), score.min(1.0)).with_bbox(bbox));
    }

    Ok(non_max_suppression(detections, DEFAULT_IOU_THRESHOLD))
}

impl Detector for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame, confidence: Confidence) -> Result<DetectorOutput> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<Ix3>()
            .context("expected model output of shape [1, N, 5 + classes]")?;
        let detections = decode_rows(rows, self.input, &self.classes, confidence)?;

        Ok(DetectorOutput {
            annotated: draw_detections(frame, &detections),
            detections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tract_onnx::prelude::tract_ndarray::Array3;

    const COLS: usize = ROW_PREFIX + 2;

    fn rows(data: &[[f32; COLS]]) -> Array3<f32> {
        let flat: Vec<f32> = data.iter().flatten().copied().collect();
        Array3::from_shape_vec((1, data.len(), COLS), flat).unwrap()
    }

    fn decode(data: &[[f32; COLS]], confidence: f32) -> Vec<Detection> {
        let classes = ClassNames::parse("cat\ndog").unwrap();
        let input = FrameSize::new(100, 100).unwrap();
        decode_rows(
            rows(data).view(),
            input,
            &classes,
            Confidence::new(confidence).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn keeps_rows_at_threshold_and_drops_rows_below() {
        let detections = decode(
            &[
                [50.0, 50.0, 20.0, 40.0, 1.0, 0.2, 0.5],
                [10.0, 10.0, 8.0, 8.0, 1.0, 0.49, 0.1],
            ],
            0.5,
        );
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "dog");
        assert_eq!(detections[0].confidence, 0.5);
    }

    #[test]
    fn boxes_are_normalized_to_model_input() {
        let detections = decode(&[[50.0, 50.0, 20.0, 40.0, 0.9, 0.9, 0.1]], 0.25);
        let bbox = detections[0].bbox.unwrap();
        assert_eq!(detections[0].label, "cat");
        assert!((bbox.x - 0.4).abs() < 1e-6);
        assert!((bbox.y - 0.3).abs() < 1e-6);
        assert!((bbox.w - 0.2).abs() < 1e-6);
        assert!((bbox.h - 0.4).abs() < 1e-6);
    }

    #[test]
    fn overlapping_rows_of_one_class_collapse() {
        let detections = decode(
            &[
                [50.0, 50.0, 20.0, 20.0, 0.8, 0.9, 0.0],
                [52.0, 50.0, 20.0, 20.0, 0.9, 0.9, 0.0],
                [51.0, 50.0, 20.0, 20.0, 0.9, 0.0, 0.8],
                [10.0, 10.0, 8.0, 8.0, 0.9, 0.9, 0.0],
            ],
            0.25,
        );
        let cats: Vec<_> = detections.iter().filter(|d| d.label == "cat").collect();
        assert_eq!(cats.len(), 2);
        assert!((cats[0].confidence - 0.81).abs() < 1e-6);
        assert_eq!(detections.iter().filter(|d| d.label == "dog").count(), 1);
    }

    #[test]
    fn rows_without_class_scores_are_rejected() {
        let empty = Array3::<f32>::zeros((1, 1, ROW_PREFIX));
        let classes = ClassNames::coco();
        let input = FrameSize::new(64, 64).unwrap();
        assert!(decode_rows(empty.view(), input, &classes, Confidence::default()).is_err());
    }
}
