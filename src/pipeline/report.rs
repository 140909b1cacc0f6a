//! The structured damage report.
//!
//! A report is an ordered mapping from part label to the damages found on
//! that part. Part labels appear in first-encounter order of the surviving
//! detections, so two runs over the same image produce the same report,
//! byte for byte.

use serde::{Deserialize, Serialize};

/// Severity grade of a single damage, relative to the part it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Repair or repaint is usually enough.
    Minor,
    /// Large relative to the part; replacement is likely.
    Severe,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "minor"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

/// One damage found on a part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageEntry {
    /// Damage class label, e.g. "dent" or "scratch".
    pub label: String,
    /// Detector confidence of the surviving detection.
    pub confidence: f32,
    /// Severity grade by relative area.
    pub severity: Severity,
}

/// All damages found on one part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartReport {
    /// Part label, or the fallback zone label for unmatched detections.
    pub part: String,
    /// Damages in the order their detections survived suppression.
    pub damages: Vec<DamageEntry>,
}

/// Ordered mapping from part label to damages.
///
/// An empty report is a valid, successful result: no damage was found
/// above threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageReport {
    pub entries: Vec<PartReport>,
}

impl DamageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of damages across all parts.
    pub fn damage_count(&self) -> usize {
        self.entries.iter().map(|e| e.damages.len()).sum()
    }

    /// Appends a damage under the given part label, creating the part
    /// entry on first encounter (preserving encounter order).
    pub fn push(&mut self, part_label: &str, entry: DamageEntry) {
        match self.entries.iter_mut().find(|e| e.part == part_label) {
            Some(existing) => existing.damages.push(entry),
            None => self.entries.push(PartReport {
                part: part_label.to_string(),
                damages: vec![entry],
            }),
        }
    }

    /// The report for one part, if any damage was found on it.
    pub fn part(&self, label: &str) -> Option<&PartReport> {
        self.entries.iter().find(|e| e.part == label)
    }

    /// The plain part-label to damage-class-labels view of the report.
    pub fn by_part(&self) -> Vec<(&str, Vec<&str>)> {
        self.entries
            .iter()
            .map(|e| {
                (
                    e.part.as_str(),
                    e.damages.iter().map(|d| d.label.as_str()).collect(),
                )
            })
            .collect()
    }
}
