//! The assessment pipeline and its report types.

pub mod assessor;
pub mod report;

pub use assessor::{Assessment, DamageAssessor, DamageCandidate, SurvivingDetection};
pub use report::{DamageEntry, DamageReport, PartReport, Severity};
