//! Rendering of assessment results onto the photograph.
//!
//! The annotated image is built in two layers: the part polygon outlines
//! first (outlines only, no part boxes), then one rectangle and class label
//! per surviving damage detection. Label text needs a font; when no system
//! font can be found, boxes are still drawn and text is skipped.

use crate::core::traits::PartRegion;
use crate::pipeline::assessor::SurvivingDetection;
use crate::processors::geometry::BoundingBox;
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info};

/// Color of damage boxes and their labels.
const DAMAGE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Outline colors cycled across part regions.
const PART_PALETTE: [Rgb<u8>; 6] = [
    Rgb([0, 255, 0]),
    Rgb([0, 200, 255]),
    Rgb([255, 200, 0]),
    Rgb([200, 0, 255]),
    Rgb([0, 120, 255]),
    Rgb([255, 120, 0]),
];

/// Configuration for assessment visualization.
pub struct VisualizationConfig {
    /// The font to use for damage labels. If None, text rendering is
    /// skipped.
    pub font: Option<FontVec>,
    /// The scale factor for the label font.
    pub font_scale: f32,
    /// The thickness of damage box lines.
    pub bbox_thickness: i32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 20.0,
            bbox_thickness: 3,
        }
    }
}

impl VisualizationConfig {
    /// Creates a configuration with a font loaded from the specified path.
    pub fn with_font_path(font_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let font_data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(font_data)
            .map_err(|_| format!("Failed to parse font file: {}", font_path.display()))?;
        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    /// Creates a configuration with a system font, falling back to the
    /// fontless default when none of the common locations has one.
    pub fn with_system_font() -> Self {
        let font_paths = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];

        for path in &font_paths {
            if let Ok(font_data) = std::fs::read(path)
                && let Ok(font) = FontVec::try_from_vec(font_data)
            {
                info!("Loaded system font: {}", path);
                return Self {
                    font: Some(font),
                    ..Self::default()
                };
            }
        }

        debug!("No system font found, damage labels will be skipped");
        Self::default()
    }
}

/// Renders the annotated copy of the original image: part outlines as the
/// base layer, then a box and label per surviving damage detection. The
/// original image is not modified.
pub fn render_assessment(
    image: &RgbImage,
    parts: &[PartRegion],
    detections: &[SurvivingDetection],
    config: &VisualizationConfig,
) -> RgbImage {
    let mut canvas = image.clone();

    for (i, part) in parts.iter().enumerate() {
        draw_polygon_outline(&mut canvas, part, PART_PALETTE[i % PART_PALETTE.len()]);
    }

    for detection in detections {
        draw_damage(&mut canvas, detection, config);
    }

    canvas
}

/// Draws the closed outline of a part polygon.
fn draw_polygon_outline(canvas: &mut RgbImage, part: &PartRegion, color: Rgb<u8>) {
    let n = part.polygon.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let a = part.polygon[i];
        let b = part.polygon[(i + 1) % n];
        draw_line_segment_mut(canvas, (a.x, a.y), (b.x, b.y), color);
    }
}

/// Draws the box and class label of one surviving detection.
fn draw_damage(canvas: &mut RgbImage, detection: &SurvivingDetection, config: &VisualizationConfig) {
    let (img_w, img_h) = (canvas.width() as i32, canvas.height() as i32);
    let bbox = detection
        .candidate
        .bbox
        .clamp_to(img_w as f32, img_h as f32);
    let Some(rect) = bbox_to_rect(&bbox) else {
        return;
    };

    for thickness in 0..config.bbox_thickness {
        let thick_rect = Rect::at(rect.left() + thickness, rect.top() + thickness).of_size(
            (rect.width() as i32 - 2 * thickness).max(1) as u32,
            (rect.height() as i32 - 2 * thickness).max(1) as u32,
        );
        if is_rect_in_bounds(&thick_rect, img_w, img_h) {
            draw_hollow_rect_mut(canvas, thick_rect, DAMAGE_COLOR);
        }
    }

    if let Some(ref font) = config.font {
        // Label sits just above the box, clamped into the image.
        let text_y = (rect.top() - config.font_scale as i32 - 4).max(0);
        let text_x = rect.left().max(0);
        if text_x < img_w && text_y < img_h {
            draw_text_mut(
                canvas,
                DAMAGE_COLOR,
                text_x,
                text_y,
                config.font_scale,
                font,
                &detection.candidate.label,
            );
        }
    }
}

fn bbox_to_rect(bbox: &BoundingBox) -> Option<Rect> {
    let width = bbox.width().round() as u32;
    let height = bbox.height().round() as u32;
    (width > 0 && height > 0)
        .then(|| Rect::at(bbox.x1 as i32, bbox.y1 as i32).of_size(width, height))
}

fn is_rect_in_bounds(rect: &Rect, img_width: i32, img_height: i32) -> bool {
    rect.left() >= 0 && rect.top() >= 0 && rect.right() < img_width && rect.bottom() < img_height
}
