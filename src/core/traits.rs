//! Capability traits for the two pretrained models.
//!
//! The pipeline never talks to ONNX Runtime directly; it consumes these two
//! minimal interfaces so pipeline-logic tests can run against deterministic
//! stub implementations returning fixed synthetic boxes and polygons. The
//! real implementations live in [`crate::models`].

use crate::core::AssessResult;
use crate::processors::geometry::{BoundingBox, Point};
use image::RgbImage;

/// A candidate damage detection in the coordinate space of the image the
/// detector was given (a tile crop, for the damage model).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f32,
}

/// A labeled vehicle-part polygon in full-image coordinates.
///
/// Produced once per image by the part segmentor, read-only for the rest of
/// the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PartRegion {
    pub label: String,
    pub polygon: Vec<Point>,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Damage detection on a single image crop.
pub trait DamageDetector {
    /// Returns candidate damage boxes with class label and confidence, in
    /// the crop's local coordinates. `confidence_floor` is the minimum
    /// score the detector should bother returning.
    fn detect(&self, image: &RgbImage, confidence_floor: f32) -> AssessResult<Vec<Detection>>;
}

/// Part segmentation on the full image.
pub trait PartSegmentor {
    /// Returns one labeled region polygon per detected vehicle part, in
    /// full-image coordinates.
    fn segment(&self, image: &RgbImage, confidence_floor: f32) -> AssessResult<Vec<PartRegion>>;
}
