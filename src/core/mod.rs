//! Core error handling, configuration, and model capability traits.

pub mod config;
pub mod errors;
pub mod traits;

pub use config::{AssessConfig, ClassFloor, ConfidenceGate, SeverityConfig, SuppressionConfig};
pub use errors::{AssessError, AssessResult};
pub use traits::{DamageDetector, Detection, PartRegion, PartSegmentor};
