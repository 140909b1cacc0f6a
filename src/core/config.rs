//! Pipeline configuration.
//!
//! All tunable constants of the pipeline live here so they can be loaded
//! from JSON instead of being hard-coded: the class-aware confidence gate,
//! the tile overlap fraction, the duplicate-suppression parameters, model
//! input size hints, and report/visualization knobs. The `Default`
//! implementations carry the production constants.

use serde::{Deserialize, Serialize};

/// A minimum-confidence floor for damage classes whose label contains a
/// given substring (matched case-insensitively).
///
/// Per-class floors exist because the classes fail differently: dents are
/// prone to false positives from specular highlights and need a stricter
/// bar, while scratches are visually subtle and need a more permissive one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFloor {
    /// Substring the class label must contain for this floor to apply.
    pub label_contains: String,
    /// Minimum confidence required (inclusive).
    pub min_confidence: f32,
}

/// Class-aware confidence gating applied to raw detector candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceGate {
    /// Base floor passed to the detector itself. Lower than every
    /// class-specific floor so the gate sees all candidates it might keep.
    pub base_floor: f32,
    /// Class labels containing any of these substrings are always rejected.
    pub reject_labels: Vec<String>,
    /// Per-class minimum-confidence floors, matched by label substring.
    /// First matching entry wins.
    pub class_floors: Vec<ClassFloor>,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            base_floor: 0.15,
            reject_labels: vec!["no damage".to_string()],
            class_floors: vec![
                ClassFloor {
                    label_contains: "dent".to_string(),
                    min_confidence: 0.35,
                },
                ClassFloor {
                    label_contains: "scratch".to_string(),
                    min_confidence: 0.25,
                },
            ],
        }
    }
}

impl ConfidenceGate {
    /// Decides whether a candidate with the given class label and
    /// confidence passes the gate. Floors are inclusive: a confidence
    /// exactly equal to the floor is accepted.
    pub fn accepts(&self, label: &str, confidence: f32) -> bool {
        let label = label.to_lowercase();
        if self
            .reject_labels
            .iter()
            .any(|r| label.contains(&r.to_lowercase()))
        {
            return false;
        }
        let floor = self
            .class_floors
            .iter()
            .find(|f| label.contains(&f.label_contains.to_lowercase()))
            .map(|f| f.min_confidence)
            .unwrap_or(self.base_floor);
        confidence >= floor
    }
}

/// Parameters for greedy duplicate suppression across tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionConfig {
    /// Candidates overlapping a kept candidate beyond this IoU are dropped.
    pub iou_threshold: f32,
    /// Candidates below this score are dropped before suppression even if
    /// unique. Sits below every class floor, so it is effectively redundant
    /// after gating, but it is kept as a single configurable value.
    pub score_floor: f32,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            score_floor: 0.15,
        }
    }
}

/// Severity grading of a damage relative to the part it sits on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// A damage whose box area exceeds this fraction of its matched part's
    /// box area (or of the image area when unmatched) is graded severe.
    pub area_ratio: f32,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self { area_ratio: 0.10 }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessConfig {
    /// Class-aware confidence gating for damage candidates.
    pub gate: ConfidenceGate,
    /// Duplicate suppression parameters.
    pub suppression: SuppressionConfig,
    /// Severity grading parameters.
    pub severity: SeverityConfig,
    /// Overlap fraction of the quadrant tiles (of the half-dimension).
    pub tile_overlap: f32,
    /// Minimum confidence for part segmentation on the full image.
    pub part_confidence: f32,
    /// Input size hint for the part segmentation model (full image).
    pub part_size_hint: u32,
    /// Input size hint for the damage detection model (per tile).
    pub damage_size_hint: u32,
    /// Label assigned to detections whose centroid lies in no part polygon,
    /// signalling the image is likely a close-up without full-vehicle
    /// context.
    pub fallback_part_label: String,
    /// Prefix of the saved annotated image filename.
    pub output_prefix: String,
}

impl Default for AssessConfig {
    fn default() -> Self {
        Self {
            gate: ConfidenceGate::default(),
            suppression: SuppressionConfig::default(),
            severity: SeverityConfig::default(),
            tile_overlap: 0.1,
            part_confidence: 0.5,
            part_size_hint: 1024,
            damage_size_hint: 640,
            fallback_part_label: "unknown zone".to_string(),
            output_prefix: "result_".to_string(),
        }
    }
}

impl AssessConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file(
        path: impl AsRef<std::path::Path>,
    ) -> crate::core::AssessResult<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&data).map_err(|e| {
            crate::core::AssessError::config_error(format!(
                "failed to parse config '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}
