//! Box overlay for annotated output frames.

use crate::detect::result::{BoundingBox, Detection};
use crate::frame::{ChannelOrder, Frame, CHANNELS};

const LINE_WIDTH: u32 = 2;

// RGB
const PALETTE: [[u8; 3]; 8] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
];

/// Stable colour for a label, in RGB.
pub fn label_color(label: &str) -> [u8; 3] {
    let sum = label
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    PALETTE[sum % PALETTE.len()]
}

/// Copy `frame` and outline every detection that carries a box.
pub fn draw_detections(frame: &Frame, detections: &[Detection]) -> Frame {
    let mut out = frame.clone();
    for det in detections {
        let Some(bbox) = det.bbox else {
            continue;
        };
        let mut color = label_color(&det.label);
        if frame.order() == ChannelOrder::Bgr {
            color.swap(0, 2);
        }
        draw_box(&mut out, &bbox, color);
    }
    out
}

fn draw_box(frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3]) {
    let width = frame.width();
    let height = frame.height();
    let to_px = |v: f32, max: u32| -> u32 {
        let scaled = (v.clamp(0.0, 1.0) * max as f32).round() as u32;
        scaled.min(max.saturating_sub(1))
    };
    let x0 = to_px(bbox.x, width);
    let y0 = to_px(bbox.y, height);
    let x1 = to_px(bbox.x + bbox.w, width);
    let y1 = to_px(bbox.y + bbox.h, height);
    if x1 < x0 || y1 < y0 {
        return;
    }

    let pixels = frame.pixels_mut();
    let mut put = |x: u32, y: u32| {
        let offset = (y as usize * width as usize + x as usize) * CHANNELS;
        pixels[offset..offset + CHANNELS].copy_from_slice(&color);
    };

    for t in 0..LINE_WIDTH {
        let top = (y0 + t).min(y1);
        let bottom = y1.saturating_sub(t).max(y0);
        for x in x0..=x1 {
            put(x, top);
            put(x, bottom);
        }
        let left = (x0 + t).min(x1);
        let right = x1.saturating_sub(t).max(x0);
        for y in y0..=y1 {
            put(left, y);
            put(right, y);
        }
    }
}
