//! Detector capability: trait, result types, backends and registry.

pub mod annotate;
mod backend;
mod backends;
mod classes;
mod nms;
mod registry;
mod result;

pub use backend::Detector;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use classes::{ClassNames, COCO_CLASSES};
pub use registry::{BackendRegistry, SharedDetector};
pub use result::{
    BoundingBox, Confidence, Detection, DetectorOutput, DEFAULT_CONFIDENCE, MIN_CONFIDENCE,
};
