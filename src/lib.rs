//! # Vehicle Damage
//!
//! Vehicle body damage assessment from a photograph, built on two
//! pretrained ONNX models: a segmentation model locating vehicle body
//! parts and a detection model finding damages.
//!
//! The pipeline for one image:
//!
//! 1. **Part segmentation** on the full image, producing labeled region
//!    polygons.
//! 2. **Tiled damage detection**: the image is split into four overlapping
//!    quadrant tiles, the detector runs per tile, and candidates are
//!    gated by class-aware confidence floors and reprojected to global
//!    coordinates.
//! 3. **Duplicate suppression**: greedy IoU suppression removes the double
//!    detections the tile overlap guarantees.
//! 4. **Part matching**: each surviving detection is assigned to the first
//!    part polygon containing its centroid.
//! 5. **Report and visualization**: damages grouped by part, plus an
//!    annotated copy of the image written to disk.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vehicle_damage::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let assessor = DamageAssessor::from_onnx(
//!     "models/car_parts.onnx",
//!     "models/car_damages.onnx",
//!     vec!["door".into(), "bumper".into(), "hood".into()],
//!     vec!["dent".into(), "scratch".into(), "no damage".into()],
//!     AssessConfig::default(),
//! )?;
//!
//! let (report, saved_path) = assessor.predict_and_visualize("car.jpg", "results")?;
//! for (part, damages) in report.by_part() {
//!     println!("{part}: {damages:?}");
//! }
//! println!("annotated image: {}", saved_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! The pipeline only depends on the [`core::traits`] capability traits, so
//! its logic can be exercised with stub models returning fixed synthetic
//! boxes and polygons.

pub mod core;
pub mod models;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::core::config::{AssessConfig, ConfidenceGate, SuppressionConfig};
    pub use crate::core::errors::{AssessError, AssessResult};
    pub use crate::core::traits::{DamageDetector, Detection, PartRegion, PartSegmentor};
    pub use crate::models::{YoloDetector, YoloSegmentor};
    pub use crate::pipeline::{
        Assessment, DamageAssessor, DamageCandidate, DamageReport, Severity, SurvivingDetection,
    };
    pub use crate::processors::{BoundingBox, Point};
    pub use crate::utils::{VisualizationConfig, load_image};
}
