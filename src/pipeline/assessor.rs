//! The damage assessment pipeline.
//!
//! One `DamageAssessor` owns the two model handles and the configuration,
//! and exposes the single blocking entrypoint
//! [`DamageAssessor::predict_and_visualize`]. The flow is strictly
//! sequential: part segmentation on the full image, then tiled damage
//! detection with class-aware gating and reprojection to global
//! coordinates, duplicate suppression, centroid-based part matching, and
//! finally report building plus the annotated rendering.

use crate::core::config::AssessConfig;
use crate::core::errors::{AssessError, AssessResult};
use crate::core::traits::{DamageDetector, PartRegion, PartSegmentor};
use crate::models::{YoloDetector, YoloSegmentor};
use crate::pipeline::report::{DamageEntry, DamageReport, Severity};
use crate::processors::geometry::{BoundingBox, polygon_contains};
use crate::processors::suppression::greedy_nms;
use crate::processors::tiling::{Tile, plan_tiles};
use crate::utils::image::load_image;
use crate::utils::visualization::{VisualizationConfig, render_assessment};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A gated damage detection in global image coordinates.
///
/// Immutable after creation: a candidate either survives suppression or is
/// discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageCandidate {
    pub bbox: BoundingBox,
    pub label: String,
    pub confidence: f32,
    /// Index of the tile the detection came from.
    pub tile_index: usize,
}

/// A candidate that survived suppression, with its part assignment.
#[derive(Debug, Clone)]
pub struct SurvivingDetection {
    pub candidate: DamageCandidate,
    /// Matched part label; `None` means no part polygon contained the
    /// detection centroid (likely a close-up without full-vehicle context).
    pub part_label: Option<String>,
    pub severity: Severity,
}

/// Full result of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub parts: Vec<PartRegion>,
    pub detections: Vec<SurvivingDetection>,
    pub report: DamageReport,
}

/// The damage assessment pipeline over two model capabilities.
///
/// Known limitation: part matching is first-match-wins over the part
/// regions in their detection order. When part polygons overlap (a bumper
/// region over a fender, say) the detection is assigned to whichever part
/// the segmentor listed first, not to the smallest enclosing polygon.
pub struct DamageAssessor<S, D> {
    segmentor: S,
    detector: D,
    config: AssessConfig,
    vis: VisualizationConfig,
}

impl DamageAssessor<YoloSegmentor, YoloDetector> {
    /// Loads both ONNX models and builds the pipeline. Fails fatally when
    /// either artifact cannot be loaded.
    pub fn from_onnx(
        parts_model: impl AsRef<Path>,
        damage_model: impl AsRef<Path>,
        part_labels: Vec<String>,
        damage_labels: Vec<String>,
        config: AssessConfig,
    ) -> AssessResult<Self> {
        info!("loading part segmentation and damage detection models");
        let segmentor =
            YoloSegmentor::from_file(parts_model, part_labels, config.part_size_hint)?;
        let detector =
            YoloDetector::from_file(damage_model, damage_labels, config.damage_size_hint)?;
        info!("models loaded");
        Ok(Self::new(segmentor, detector, config))
    }
}

impl<S: PartSegmentor, D: DamageDetector> DamageAssessor<S, D> {
    /// Builds the pipeline over arbitrary model capability implementations.
    pub fn new(segmentor: S, detector: D, config: AssessConfig) -> Self {
        Self {
            segmentor,
            detector,
            config,
            vis: VisualizationConfig::with_system_font(),
        }
    }

    pub fn config(&self) -> &AssessConfig {
        &self.config
    }

    /// Runs the full pipeline on a decoded image.
    pub fn assess(&self, image: &RgbImage) -> AssessResult<Assessment> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(AssessError::invalid_input("empty image"));
        }

        // Part regions first: matching needs them, and they never change
        // afterwards.
        let parts = self.segmentor.segment(image, self.config.part_confidence)?;
        debug!(parts = parts.len(), "segmented vehicle parts");

        // Tiled detection. Each tile yields its own immutable candidate
        // list; the lists are concatenated in tile order.
        let tiles = plan_tiles(width, height, self.config.tile_overlap);
        let per_tile: Vec<Vec<DamageCandidate>> = tiles
            .iter()
            .map(|tile| self.detect_tile(image, tile))
            .collect::<AssessResult<_>>()?;
        let candidates: Vec<DamageCandidate> = per_tile.into_iter().flatten().collect();

        // Cross-tile duplicates only become visible in global coordinates.
        let boxes: Vec<BoundingBox> = candidates.iter().map(|c| c.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|c| c.confidence).collect();
        let keep = greedy_nms(
            &boxes,
            &scores,
            self.config.suppression.iou_threshold,
            self.config.suppression.score_floor,
        );
        info!(
            raw = candidates.len(),
            kept = keep.len(),
            "duplicate suppression"
        );

        let image_area = width as f32 * height as f32;
        let mut detections = Vec::with_capacity(keep.len());
        let mut report = DamageReport::new();
        for &idx in &keep {
            let candidate = candidates[idx].clone();
            let part = match_part(&parts, &candidate.bbox);
            let severity = self.grade_severity(&candidate, part, image_area);

            let part_label = part.map(|p| p.label.clone());
            report.push(
                part_label
                    .as_deref()
                    .unwrap_or(&self.config.fallback_part_label),
                DamageEntry {
                    label: candidate.label.clone(),
                    confidence: candidate.confidence,
                    severity,
                },
            );
            detections.push(SurvivingDetection {
                candidate,
                part_label,
                severity,
            });
        }

        Ok(Assessment {
            parts,
            detections,
            report,
        })
    }

    /// Full entrypoint: decode the image at `image_path`, assess it, write
    /// the annotated copy to `output_dir/<prefix><filename>`, and return
    /// the report plus the saved path.
    pub fn predict_and_visualize(
        &self,
        image_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> AssessResult<(DamageReport, PathBuf)> {
        let image_path = image_path.as_ref();
        let output_dir = output_dir.as_ref();
        info!(image = %image_path.display(), "assessing vehicle image");

        let image = load_image(image_path)?;
        let assessment = self.assess(&image)?;

        let annotated =
            render_assessment(&image, &assessment.parts, &assessment.detections, &self.vis);

        std::fs::create_dir_all(output_dir)?;
        let filename = image_path
            .file_name()
            .ok_or_else(|| AssessError::invalid_input("image path has no filename"))?;
        let save_path = output_dir.join(format!(
            "{}{}",
            self.config.output_prefix,
            filename.to_string_lossy()
        ));
        annotated.save(&save_path).map_err(|e| AssessError::OutputWrite {
            path: save_path.clone(),
            source: e,
        })?;
        info!(path = %save_path.display(), damages = assessment.report.damage_count(), "saved annotated image");

        Ok((assessment.report, save_path))
    }

    /// Detects damages on one tile: crop, run the detector at the base
    /// floor, apply the class-aware gate, translate to global coordinates.
    fn detect_tile(&self, image: &RgbImage, tile: &Tile) -> AssessResult<Vec<DamageCandidate>> {
        let crop = tile.crop(image);
        let detections = self.detector.detect(&crop, self.config.gate.base_floor)?;
        let candidates: Vec<DamageCandidate> = detections
            .into_iter()
            .filter(|d| self.config.gate.accepts(&d.label, d.confidence))
            .map(|d| DamageCandidate {
                bbox: d.bbox.translate(tile.x1 as f32, tile.y1 as f32),
                label: d.label,
                confidence: d.confidence,
                tile_index: tile.index,
            })
            .collect();
        debug!(tile = tile.index, candidates = candidates.len(), "tile scanned");
        Ok(candidates)
    }

    fn grade_severity(
        &self,
        candidate: &DamageCandidate,
        part: Option<&PartRegion>,
        image_area: f32,
    ) -> Severity {
        let reference = part.map(|p| p.bbox.area()).unwrap_or(image_area);
        if reference > 0.0 && candidate.bbox.area() / reference > self.config.severity.area_ratio
        {
            Severity::Severe
        } else {
            Severity::Minor
        }
    }
}

/// Finds the part containing the detection centroid.
///
/// Part regions are walked in their original detection order and the first
/// polygon containing the centroid wins, even when several polygons
/// overlap.
fn match_part<'a>(parts: &'a [PartRegion], bbox: &BoundingBox) -> Option<&'a PartRegion> {
    let (cx, cy) = bbox.center();
    parts
        .iter()
        .find(|p| polygon_contains(&p.polygon, cx as f32, cy as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::Detection;
    use crate::processors::geometry::Point;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Segmentor returning a fixed set of part regions.
    struct StubSegmentor {
        parts: Vec<PartRegion>,
    }

    impl PartSegmentor for StubSegmentor {
        fn segment(
            &self,
            _image: &RgbImage,
            _confidence_floor: f32,
        ) -> AssessResult<Vec<PartRegion>> {
            Ok(self.parts.clone())
        }
    }

    /// Detector replaying a scripted response per tile call. The call
    /// counter wraps, so a second pipeline run sees the same script.
    struct ScriptedDetector {
        responses: Vec<Vec<Detection>>,
        calls: AtomicUsize,
    }

    impl ScriptedDetector {
        fn new(responses: Vec<Vec<Detection>>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DamageDetector for ScriptedDetector {
        fn detect(
            &self,
            _image: &RgbImage,
            _confidence_floor: f32,
        ) -> AssessResult<Vec<Detection>> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst) % self.responses.len();
            Ok(self.responses[idx].clone())
        }
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32, label: &str, confidence: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            label: label.to_string(),
            confidence,
        }
    }

    fn rect_part(label: &str, x1: f32, y1: f32, x2: f32, y2: f32) -> PartRegion {
        PartRegion {
            label: label.to_string(),
            polygon: vec![
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ],
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: 0.9,
        }
    }

    /// A 1000x800 image with one scratch at confidence 0.30
    /// centered in a "door" polygon, detected identically in two
    /// overlapping tiles.
    fn door_scenario(conf: f32) -> DamageAssessor<StubSegmentor, ScriptedDetector> {
        // Tiles for 1000x800 at 10% overlap: TL (0,0)-(550,440) and
        // BR (450,360)-(1000,800) both contain the global box
        // (480,380)-(520,420).
        let detector = ScriptedDetector::new(vec![
            vec![detection(480.0, 380.0, 520.0, 420.0, "scratch", conf)],
            vec![],
            vec![],
            vec![detection(30.0, 20.0, 70.0, 60.0, "scratch", conf)],
        ]);
        let segmentor = StubSegmentor {
            parts: vec![rect_part("door", 300.0, 200.0, 700.0, 600.0)],
        };
        DamageAssessor::new(segmentor, detector, AssessConfig::default())
    }

    #[test]
    fn duplicate_across_tiles_collapses_to_one_report_entry() {
        let assessor = door_scenario(0.30);
        let image = RgbImage::new(1000, 800);
        let assessment = assessor.assess(&image).unwrap();

        assert_eq!(assessment.detections.len(), 1);
        assert_eq!(
            assessment.detections[0].part_label.as_deref(),
            Some("door")
        );
        assert_eq!(assessment.report.by_part(), vec![("door", vec!["scratch"])]);
    }

    #[test]
    fn scratch_below_class_floor_is_rejected() {
        // 0.20 is above the base floor but below the 0.25 scratch gate.
        let assessor = door_scenario(0.20);
        let image = RgbImage::new(1000, 800);
        let assessment = assessor.assess(&image).unwrap();

        assert!(assessment.detections.is_empty());
        assert!(assessment.report.is_empty());
    }

    #[test]
    fn assessment_is_deterministic() {
        let assessor = door_scenario(0.30);
        let image = RgbImage::new(1000, 800);
        let first = assessor.assess(&image).unwrap();
        let second = assessor.assess(&image).unwrap();
        assert_eq!(first.report.by_part(), second.report.by_part());
        assert_eq!(first.detections.len(), second.detections.len());
    }

    #[test]
    fn unmatched_detection_gets_fallback_label() {
        // Part polygon far away from the detection centroid.
        let detector = ScriptedDetector::new(vec![
            vec![detection(10.0, 10.0, 50.0, 50.0, "dent", 0.9)],
            vec![],
            vec![],
            vec![],
        ]);
        let segmentor = StubSegmentor {
            parts: vec![rect_part("hood", 600.0, 600.0, 900.0, 790.0)],
        };
        let assessor = DamageAssessor::new(segmentor, detector, AssessConfig::default());
        let assessment = assessor.assess(&RgbImage::new(1000, 800)).unwrap();

        assert_eq!(assessment.detections.len(), 1);
        assert_eq!(assessment.detections[0].part_label, None);
        assert_eq!(
            assessment.report.by_part(),
            vec![("unknown zone", vec!["dent"])]
        );
    }

    #[test]
    fn first_listed_part_wins_when_polygons_overlap() {
        let detector = ScriptedDetector::new(vec![
            vec![detection(100.0, 100.0, 140.0, 140.0, "dent", 0.9)],
            vec![],
            vec![],
            vec![],
        ]);
        let segmentor = StubSegmentor {
            parts: vec![
                rect_part("bumper", 0.0, 0.0, 400.0, 400.0),
                rect_part("fender", 50.0, 50.0, 200.0, 200.0),
            ],
        };
        let assessor = DamageAssessor::new(segmentor, detector, AssessConfig::default());
        let assessment = assessor.assess(&RgbImage::new(1000, 800)).unwrap();
        assert_eq!(
            assessment.detections[0].part_label.as_deref(),
            Some("bumper")
        );
    }

    #[test]
    fn severity_grades_by_relative_area() {
        // Damage 40x40 on a 400x400 part: ratio 0.01, minor. The same
        // damage on a 100x100 part: ratio 0.16, severe.
        for (part_size, expected) in [(400.0, Severity::Minor), (100.0, Severity::Severe)] {
            let detector = ScriptedDetector::new(vec![
                vec![detection(100.0, 100.0, 140.0, 140.0, "dent", 0.9)],
                vec![],
                vec![],
                vec![],
            ]);
            let segmentor = StubSegmentor {
                parts: vec![rect_part("door", 80.0, 80.0, 80.0 + part_size, 80.0 + part_size)],
            };
            let assessor = DamageAssessor::new(segmentor, detector, AssessConfig::default());
            let assessment = assessor.assess(&RgbImage::new(1000, 800)).unwrap();
            assert_eq!(assessment.detections[0].severity, expected);
        }
    }

    #[test]
    fn no_damage_label_is_always_dropped() {
        let detector = ScriptedDetector::new(vec![
            vec![detection(100.0, 100.0, 140.0, 140.0, "No Damage", 0.99)],
            vec![],
            vec![],
            vec![],
        ]);
        let segmentor = StubSegmentor { parts: vec![] };
        let assessor = DamageAssessor::new(segmentor, detector, AssessConfig::default());
        let assessment = assessor.assess(&RgbImage::new(1000, 800)).unwrap();
        assert!(assessment.report.is_empty());
    }

    #[test]
    fn empty_image_is_invalid_input() {
        let detector = ScriptedDetector::new(vec![vec![]]);
        let segmentor = StubSegmentor { parts: vec![] };
        let assessor = DamageAssessor::new(segmentor, detector, AssessConfig::default());
        let err = assessor.assess(&RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, AssessError::InvalidInput { .. }));
    }

    #[test]
    fn predict_and_visualize_writes_prefixed_output() {
        let dir = std::env::temp_dir().join(format!(
            "vehicle-damage-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let input_path = dir.join("car.png");
        std::fs::create_dir_all(&dir).unwrap();
        RgbImage::new(1000, 800).save(&input_path).unwrap();

        let assessor = door_scenario(0.30);
        let output_dir = dir.join("results");
        let (report, saved) = assessor
            .predict_and_visualize(&input_path, &output_dir)
            .unwrap();

        assert_eq!(report.by_part(), vec![("door", vec!["scratch"])]);
        assert_eq!(saved, output_dir.join("result_car.png"));
        assert!(saved.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
