#![cfg_attr(not(feature = "backend-tract"), allow(dead_code))]

use std::cmp::Ordering;

use crate::detect::result::Detection;

pub(crate) const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Greedy per-label non-maximum suppression.
///
/// Detections are visited in descending confidence order; a detection is dropped
/// when it overlaps a kept detection of the same label by more than `iou_threshold`.
/// Detections without a box are always kept.
pub(crate) fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = candidate.bbox.is_some_and(|bbox| {
            kept.iter().any(|k| {
                k.label == candidate.label
                    && k.bbox.is_some_and(|kb| kb.iou(&bbox) > iou_threshold)
            })
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
